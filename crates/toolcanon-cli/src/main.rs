//! toolcanon - structured results for developer-tool CLIs
//!
//! ## Commands
//!
//! - `parse`: canonicalize already-captured tool output
//! - `run`: execute a built-in tool and canonicalize what it printed
//! - `session`: drive a git merge, rebase, cherry-pick or bisect step
//! - `tools`: list supported tool ids

mod config;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, Level};

use toolcanon_core::{
    render_session, tool, RawOutput, Representation, Response, SessionKind, SessionStep,
};
use toolcanon_exec::{ExecOptions, Pipeline, SessionDriver, TokioExecutor};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "toolcanon")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validated, structured results from developer-tool output", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (default: ./toolcanon.toml when present)
    #[arg(long, global = true, env = "TOOLCANON_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize captured output of a tool
    Parse {
        /// Tool id (see `toolcanon tools`)
        tool: String,

        /// File holding the tool's stdout (default: read stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// File holding the tool's stderr
        #[arg(long)]
        stderr: Option<PathBuf>,

        /// Exit code the tool returned
        #[arg(long, default_value = "0")]
        exit_code: i32,

        /// Emit the compact projection instead of the full result
        #[arg(long)]
        compact: bool,

        /// Print structured JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Run a built-in tool and canonicalize its output
    Run {
        /// Tool id (see `toolcanon tools`)
        tool: String,

        /// Values passed to the tool (paths, refs, packages). Values starting
        /// with '-' are rejected.
        values: Vec<String>,

        /// Working directory for the tool
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Kill the tool after this many seconds
        #[arg(long, env = "TOOLCANON_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,

        /// Emit the compact projection instead of the full result
        #[arg(long)]
        compact: bool,

        /// Print structured JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Drive one step of a git multi-step flow
    Session {
        /// merge | rebase | cherry-pick | bisect
        kind: String,

        /// start | advance | continue | skip | quit | abort | status
        /// (bisect also accepts good/bad through advance)
        step: String,

        /// Refs for start, or a verdict plus refs for a bisect advance
        values: Vec<String>,

        /// Work tree (default: current directory)
        #[arg(long, default_value = ".")]
        cwd: PathBuf,

        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    toolcanon_core::telemetry::init_tracing(cli.log_json, level);

    let config = Config::load(cli.config.as_deref())?;
    debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Parse {
            tool,
            input,
            stderr,
            exit_code,
            compact,
            json,
        } => cmd_parse(
            &config,
            &tool,
            input.as_deref(),
            stderr.as_deref(),
            exit_code,
            representation(compact),
            json,
        ),
        Commands::Run {
            tool,
            values,
            cwd,
            timeout_secs,
            compact,
            json,
        } => {
            cmd_run(
                &config,
                &tool,
                &values,
                cwd,
                timeout_secs,
                representation(compact),
                json,
            )
            .await
        }
        Commands::Session {
            kind,
            step,
            values,
            cwd,
            json,
        } => cmd_session(&kind, &step, &values, &cwd, json, &config).await,
        Commands::Tools => cmd_tools(),
    }
}

fn representation(compact: bool) -> Representation {
    if compact {
        Representation::Compact
    } else {
        Representation::Full
    }
}

/// Print a response and turn an unsuccessful result into exit status 1.
fn emit(response: &Response, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response).context("serialize response")?);
    } else {
        print!("{}", response.summary);
    }
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_parse(
    config: &Config,
    tool: &str,
    input: Option<&Path>,
    stderr: Option<&Path>,
    exit_code: i32,
    representation: Representation,
    json: bool,
) -> Result<()> {
    let stdout = match input {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            buf
        }
    };
    let stderr = match stderr {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?,
        None => String::new(),
    };
    let raw = RawOutput {
        stdout,
        stderr,
        exit_code: Some(exit_code),
        ..RawOutput::default()
    };

    let pipeline = Pipeline::new(TokioExecutor::new(config.exec.clone()), config.compaction);
    let response = pipeline
        .parse(tool, &raw, representation)
        .with_context(|| format!("canonicalize {tool} output"))?;
    emit(&response, json)
}

async fn cmd_run(
    config: &Config,
    tool: &str,
    values: &[String],
    cwd: Option<PathBuf>,
    timeout_secs: Option<u64>,
    representation: Representation,
    json: bool,
) -> Result<()> {
    let pipeline = Pipeline::new(TokioExecutor::new(config.exec.clone()), config.compaction);
    let opts = ExecOptions {
        cwd,
        timeout: timeout_secs.map(Duration::from_secs),
        ..ExecOptions::default()
    };
    let run = pipeline
        .run(tool, values, &opts, representation)
        .await
        .with_context(|| format!("run {tool}"))?;
    debug!(run_id = %run.id, started_at = %run.started_at, "run finished");
    emit(&run.response, json)
}

async fn cmd_session(
    kind: &str,
    step: &str,
    values: &[String],
    cwd: &Path,
    json: bool,
    config: &Config,
) -> Result<()> {
    let Some(kind) = SessionKind::parse(kind) else {
        bail!("unknown session kind '{kind}' (expected merge, rebase, cherry-pick or bisect)");
    };
    let mut driver = SessionDriver::new(TokioExecutor::new(config.exec.clone()), kind, cwd);

    // Bisect verdicts read naturally as steps of their own.
    let (step_name, values) = match step {
        "good" | "bad" | "old" | "new" if kind == SessionKind::Bisect => {
            let mut v = vec![step.to_string()];
            v.extend_from_slice(values);
            ("advance", v)
        }
        other => (other, values.to_vec()),
    };

    let session = if step_name == "status" {
        driver
            .status()
            .await
            .with_context(|| format!("{} status", kind.subcommand()))?
    } else {
        let Some(step) = SessionStep::parse(step_name) else {
            bail!("unknown session step '{step_name}'");
        };
        driver
            .step(step, &values)
            .await
            .with_context(|| format!("{} {}", kind.subcommand(), step.as_str()))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(session).context("serialize session")?);
    } else {
        print!("{}", render_session(session));
    }
    Ok(())
}

fn cmd_tools() -> Result<()> {
    for t in tool::builtin().tools() {
        println!("{:<14} {:<12} {}", t.id, t.parser.kind().as_str(), t.description);
    }
    Ok(())
}
