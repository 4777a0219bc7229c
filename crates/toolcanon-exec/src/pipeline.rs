//! Execute a tool, canonicalize its output and build the response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use toolcanon_core::tool::{self, ToolRegistry};
use toolcanon_core::{respond, CompactionConfig, RawOutput, Representation, Response};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::executor::{ExecOptions, ProcessExecutor};
use crate::invocation::{invocation_for, Invocation};

/// Record of one executed invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub invocation: Invocation,
    pub response: Response,
}

pub struct Pipeline<E: ProcessExecutor> {
    executor: E,
    registry: &'static ToolRegistry,
    compaction: CompactionConfig,
}

impl<E: ProcessExecutor> Pipeline<E> {
    /// Pipeline over the built-in tool registry.
    pub fn new(executor: E, compaction: CompactionConfig) -> Self {
        Self {
            executor,
            registry: tool::builtin(),
            compaction,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Canonicalize already-captured output.
    pub fn parse(&self, tool: &str, raw: &RawOutput, representation: Representation) -> Result<Response> {
        let result = self.registry.canonicalize(tool, raw)?;
        Ok(respond(&result, representation, &self.compaction)?)
    }

    /// Run `tool` with the caller's `values` and canonicalize what it printed.
    ///
    /// A non-zero exit or a timeout is not an error here; both are facts
    /// carried in the result context.
    pub async fn run(
        &self,
        tool: &str,
        values: &[String],
        opts: &ExecOptions,
        representation: Representation,
    ) -> Result<PipelineRun> {
        let invocation = invocation_for(tool, values)?;
        let id = Uuid::new_v4();
        let started_at = Utc::now();

        info!(run_id = %id, tool, command = ?invocation.command_line(), "executing");
        let raw = self
            .executor
            .execute(&invocation.program, &invocation.args, opts)
            .instrument(tracing::info_span!("toolcanon.exec", tool, run_id = %id))
            .await?;

        let response = self.parse(tool, &raw, representation)?;
        Ok(PipelineRun {
            id,
            started_at,
            invocation,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_execution() {
        let pipeline = Pipeline::new(crate::executor::TokioExecutor::default(), CompactionConfig::default());
        let resp = pipeline
            .parse(
                "go-build",
                &RawOutput::stdout("main.go:10:5: undefined: foo\n", 2),
                Representation::Full,
            )
            .expect("parse");
        assert!(!resp.success);
        assert_eq!(resp.data["counts"]["total"], 1);
    }

    #[test]
    fn test_parse_unknown_tool_errors() {
        let pipeline = Pipeline::new(crate::executor::TokioExecutor::default(), CompactionConfig::default());
        assert!(pipeline
            .parse("make", &RawOutput::default(), Representation::Compact)
            .is_err());
    }
}
