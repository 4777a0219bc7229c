//! Command lines for the built-in tools.
//!
//! Each tool id maps to a program, the fixed flags that make its output
//! parseable (JSON reporters, porcelain formats) and a rule for where the
//! caller's values go. Values are sanitized; fixed flags are not.

use serde::{Deserialize, Serialize};
use toolcanon_core::records::GIT_LOG_FORMAT;

use crate::error::{ExecError, Result};
use crate::sanitize::sanitize_values;

/// A resolved command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invocation {
    pub tool: String,
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// `program args...`, for logs and reports.
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

struct Recipe {
    program: &'static str,
    fixed: &'static [&'static str],
    /// Fixed flags that follow the values.
    trailing: &'static [&'static str],
    /// Used when the caller passes no values.
    default_values: &'static [&'static str],
    /// Values go after a `--` separator.
    separator: bool,
    min_values: usize,
}

const fn recipe(program: &'static str, fixed: &'static [&'static str]) -> Recipe {
    Recipe {
        program,
        fixed,
        trailing: &[],
        default_values: &[],
        separator: false,
        min_values: 0,
    }
}

fn recipe_for(tool: &str) -> Option<Recipe> {
    let r = match tool {
        "go-build" => Recipe {
            default_values: &["./..."],
            ..recipe("go", &["build"])
        },
        "go-vet" => Recipe {
            default_values: &["./..."],
            ..recipe("go", &["vet"])
        },
        "go-test" => Recipe {
            default_values: &["./..."],
            ..recipe("go", &["test", "-json"])
        },
        "tsc" => recipe("npx", &["--no-install", "tsc", "--noEmit", "--pretty", "false"]),
        "cargo" => recipe("cargo", &["check", "--message-format=json", "--all-targets"]),
        // Values are test name filters; libtest flags follow cargo's `--`.
        "cargo-test" => Recipe {
            trailing: &["--", "-Z", "unstable-options", "--format", "json", "--report-time"],
            ..recipe("cargo", &["test"])
        },
        "eslint" => Recipe {
            default_values: &["."],
            ..recipe("npx", &["--no-install", "eslint", "--format", "json"])
        },
        "golangci-lint" => Recipe {
            default_values: &["./..."],
            ..recipe("golangci-lint", &["run", "--out-format", "json"])
        },
        "fmt-check" => Recipe {
            default_values: &["."],
            ..recipe("gofmt", &["-l"])
        },
        "gcc" => Recipe {
            min_values: 1,
            ..recipe("gcc", &["-fsyntax-only", "-fdiagnostics-color=never"])
        },
        "clang" => Recipe {
            min_values: 1,
            ..recipe("clang", &["-fsyntax-only", "-fno-color-diagnostics"])
        },
        "mypy" => Recipe {
            default_values: &["."],
            ..recipe("mypy", &["--no-color-output", "--no-error-summary", "--show-column-numbers"])
        },
        "git-log" => Recipe {
            default_values: &["HEAD"],
            ..recipe("git", &["log", "--no-color", "--max-count=200"])
        },
        "git-diff" => recipe("git", &["diff", "--no-color", "--no-ext-diff"]),
        "git-blame" => Recipe {
            separator: true,
            min_values: 1,
            ..recipe("git", &["blame", "--porcelain"])
        },
        "logs" => Recipe {
            min_values: 1,
            ..recipe("docker", &["logs", "--tail", "1000"])
        },
        "kubectl-apply" => Recipe {
            min_values: 1,
            ..recipe("kubectl", &["apply", "-f"])
        },
        "compose" => recipe("docker", &["compose", "up", "--detach", "--no-color"]),
        _ => return None,
    };
    Some(r)
}

/// Resolve the command line for `tool` with the caller's `values`.
pub fn invocation_for(tool: &str, values: &[String]) -> Result<Invocation> {
    let recipe = recipe_for(tool).ok_or_else(|| ExecError::NotRunnable(tool.to_string()))?;
    let values = sanitize_values(values)?;
    if values.len() < recipe.min_values {
        return Err(ExecError::MissingValues {
            tool: tool.to_string(),
            min: recipe.min_values,
        });
    }

    let mut args: Vec<String> = recipe.fixed.iter().map(|s| s.to_string()).collect();
    if tool == "git-log" {
        args.push(format!("--format={GIT_LOG_FORMAT}"));
    }

    let values = if values.is_empty() {
        recipe.default_values.iter().map(|s| s.to_string()).collect()
    } else {
        values
    };
    if recipe.separator && !values.is_empty() {
        args.push("--".to_string());
    }
    args.extend(values);
    args.extend(recipe.trailing.iter().map(|s| s.to_string()));

    Ok(Invocation {
        tool: tool.to_string(),
        program: recipe.program.to_string(),
        args,
    })
}
