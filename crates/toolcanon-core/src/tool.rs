//! Tool registry and the generic canonicalization pipeline.
//!
//! Every supported tool is one [`Tool`]: an id plus the [`Parser`] that
//! maps its output onto one entity kind. [`ToolRegistry::canonicalize`] is
//! the single pipeline all of them share: parse, aggregate, attach context.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::correlate::{correlate_output, GoTestAdapter, LibtestAdapter, TestStreamAdapter};
use crate::domain::error::{CanonError, Result};
use crate::domain::raw::RawOutput;
use crate::domain::result::{CanonicalResult, Children, InputFormat, InvocationContext, ResultKind};
use crate::extract::{
    extract, CargoAdapter, DiagnosticAdapter, EslintAdapter, FmtCheckAdapter, GolangciAdapter,
    TextAdapter, TextRules,
};
use crate::obs::{self, InvocationSpan};
use crate::records;

/// How a tool's output is read.
pub enum Parser {
    Diagnostics(Box<dyn DiagnosticAdapter>),
    Tests(Box<dyn TestStreamAdapter>),
    Commits,
    Changes,
    Blame,
    Log,
    Resources,
}

impl Parser {
    pub fn kind(&self) -> ResultKind {
        match self {
            Parser::Diagnostics(_) => ResultKind::Diagnostics,
            Parser::Tests(_) => ResultKind::Tests,
            Parser::Commits => ResultKind::Commits,
            Parser::Changes => ResultKind::Changes,
            Parser::Blame => ResultKind::Blame,
            Parser::Log => ResultKind::Log,
            Parser::Resources => ResultKind::Resources,
        }
    }

    fn parse(&self, raw: &RawOutput) -> (Children, InputFormat) {
        let text = |children: Children| {
            let format = if children.is_empty() {
                InputFormat::None
            } else {
                InputFormat::Text
            };
            (children, format)
        };
        match self {
            Parser::Diagnostics(adapter) => {
                let found = extract(adapter.as_ref(), raw);
                (
                    Children::Diagnostics {
                        diagnostics: found.diagnostics,
                        raw_errors: found.raw_errors,
                    },
                    found.format,
                )
            }
            Parser::Tests(adapter) => {
                let found = correlate_output(adapter.as_ref(), raw);
                (
                    Children::Tests {
                        tests: found.tests,
                        package_failures: found.package_failures,
                    },
                    found.format,
                )
            }
            Parser::Commits => text(Children::Commits {
                commits: records::parse_git_log(&raw.stdout),
            }),
            Parser::Changes => text(Children::Changes {
                changes: records::parse_diff(&raw.stdout),
            }),
            Parser::Blame => text(Children::Blame {
                lines: records::parse_blame(&raw.stdout),
            }),
            Parser::Log => text(Children::Log {
                lines: records::parse_log(raw),
            }),
            Parser::Resources => text(Children::Resources {
                resources: records::parse_resources(&raw.combined()),
            }),
        }
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parser::Diagnostics(a) => write!(f, "Diagnostics({})", a.tool()),
            Parser::Tests(a) => write!(f, "Tests({})", a.tool()),
            other => write!(f, "{}", other.kind().as_str()),
        }
    }
}

#[derive(Debug)]
pub struct Tool {
    pub id: String,
    pub description: String,
    pub parser: Parser,
}

/// Registered tools by id.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Tool>,
}

static BUILTIN: LazyLock<ToolRegistry> = LazyLock::new(ToolRegistry::builtin);

fn text_tool(id: &str, rules: TextRules) -> Parser {
    Parser::Diagnostics(Box::new(TextAdapter::new(id, rules)))
}

impl ToolRegistry {
    /// Registry with every shipped adapter.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        let tools: Vec<(&str, &str, Parser)> = vec![
            ("go-build", "go build / go install", text_tool("go-build", TextRules::go())),
            ("go-vet", "go vet", text_tool("go-vet", TextRules::go())),
            ("tsc", "TypeScript compiler", text_tool("tsc", TextRules::tsc())),
            ("gcc", "GNU C/C++ compiler", text_tool("gcc", TextRules::gnu())),
            ("clang", "Clang C/C++ compiler", text_tool("clang", TextRules::gnu())),
            ("mypy", "mypy type checker", text_tool("mypy", TextRules::gnu())),
            (
                "cargo",
                "cargo build/check/clippy",
                Parser::Diagnostics(Box::new(CargoAdapter)),
            ),
            ("eslint", "ESLint", Parser::Diagnostics(Box::new(EslintAdapter))),
            (
                "golangci-lint",
                "golangci-lint run",
                Parser::Diagnostics(Box::new(GolangciAdapter)),
            ),
            (
                "fmt-check",
                "gofmt -l / prettier --check / cargo fmt --check",
                Parser::Diagnostics(Box::new(FmtCheckAdapter)),
            ),
            ("go-test", "go test -json", Parser::Tests(Box::new(GoTestAdapter))),
            (
                "cargo-test",
                "cargo test (libtest JSON)",
                Parser::Tests(Box::new(LibtestAdapter)),
            ),
            ("git-log", "git log", Parser::Commits),
            ("git-diff", "git diff", Parser::Changes),
            ("git-blame", "git blame --porcelain", Parser::Blame),
            ("logs", "docker logs / kubectl logs", Parser::Log),
            ("kubectl-apply", "kubectl apply/delete", Parser::Resources),
            ("compose", "docker compose up/down", Parser::Resources),
        ];
        for (id, description, parser) in tools {
            registry.register(Tool {
                id: id.to_string(),
                description: description.to_string(),
                parser,
            });
        }
        registry
    }

    /// Add or replace a tool.
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.id.clone(), tool);
    }

    pub fn get(&self, id: &str) -> Option<&Tool> {
        self.tools.get(id)
    }

    /// Tools in id order.
    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// Parse `raw` as output of tool `id`.
    ///
    /// For kinds other than diagnostics, a run that produced no records,
    /// exited non-zero and wrote to stderr is an invocation failure: the
    /// result is unsuccessful and carries the stderr verbatim. Diagnostic
    /// tools keep that stderr as raw errors instead (see [`extract`]).
    ///
    /// [`extract`]: crate::extract::extract
    pub fn canonicalize(&self, id: &str, raw: &RawOutput) -> Result<CanonicalResult> {
        let tool = self
            .get(id)
            .ok_or_else(|| CanonError::UnknownTool(id.to_string()))?;
        let _span = InvocationSpan::enter(id);

        let (children, format) = tool.parser.parse(raw);
        let invocation_failed = tool.parser.kind() != ResultKind::Diagnostics
            && children.is_empty()
            && raw.exited_nonzero()
            && !raw.stderr.trim().is_empty();

        let mut result = CanonicalResult::new(children, InvocationContext::from_raw(id, raw, format));
        if invocation_failed {
            result = result.with_failure_output(raw.stderr.clone());
        }

        obs::emit_canonicalized(
            id,
            result.kind().as_str(),
            result.counts.total(),
            result.success,
            input_format(format),
        );
        Ok(result)
    }
}

fn input_format(format: InputFormat) -> &'static str {
    match format {
        InputFormat::Json => "json",
        InputFormat::Text => "text",
        InputFormat::None => "none",
    }
}

/// Shared registry of built-in tools.
pub fn builtin() -> &'static ToolRegistry {
    &BUILTIN
}

/// Canonicalize with the built-in registry.
pub fn canonicalize(id: &str, raw: &RawOutput) -> Result<CanonicalResult> {
    BUILTIN.canonicalize(id, raw)
}
