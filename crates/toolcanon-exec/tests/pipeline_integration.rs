//! Pipeline and session driver behavior against a scripted executor.

use std::sync::Mutex;

use async_trait::async_trait;
use toolcanon_core::{CompactionConfig, RawOutput, Representation, SessionKind, SessionState, SessionStep};
use toolcanon_exec::{
    ExecError, ExecOptions, Pipeline, ProcessExecutor, SessionDriver, UNMERGED_PATHS_ARGS,
};

/// Replays canned outputs in order and records every command it was given.
#[derive(Default)]
struct ScriptedExecutor {
    outputs: Mutex<Vec<RawOutput>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    /// Files created under the cwd before returning output, keyed by call index.
    side_effects: Vec<(usize, &'static str, bool)>,
}

impl ScriptedExecutor {
    fn new(outputs: Vec<RawOutput>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into_iter().rev().collect()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ProcessExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        opts: &ExecOptions,
    ) -> toolcanon_exec::Result<RawOutput> {
        let index = {
            let mut calls = self.calls.lock().expect("lock");
            calls.push((program.to_string(), args.to_vec()));
            calls.len() - 1
        };
        if let Some(cwd) = &opts.cwd {
            for (at, path, create) in &self.side_effects {
                if *at == index {
                    let target = cwd.join(path);
                    if *create {
                        std::fs::write(&target, "").expect("create marker");
                    } else {
                        std::fs::remove_file(&target).expect("remove marker");
                    }
                }
            }
        }
        Ok(self
            .outputs
            .lock()
            .expect("lock")
            .pop()
            .unwrap_or_default())
    }
}

#[tokio::test]
async fn run_builds_command_and_canonicalizes() {
    let executor = ScriptedExecutor::new(vec![RawOutput::stdout("main.go:10:5: undefined: foo\n", 2)]);
    let pipeline = Pipeline::new(executor, CompactionConfig::default());

    let run = pipeline
        .run("go-build", &[], &ExecOptions::default(), Representation::Compact)
        .await
        .expect("run");

    assert_eq!(run.invocation.command_line(), vec!["go", "build", "./..."]);
    assert!(!run.response.success);
    assert_eq!(run.response.data["counts"]["errors"], 1);
    assert!(run.response.summary.contains("main.go:10:5: error: undefined: foo"));
    assert_eq!(pipeline.executor().calls().len(), 1);
}

#[tokio::test]
async fn timed_out_test_run_is_still_parsed() {
    let partial = RawOutput {
        stdout: "{\"Action\":\"run\",\"Package\":\"p\",\"Test\":\"TestSlow\"}\n".to_string(),
        timed_out: true,
        exit_code: None,
        ..RawOutput::default()
    };
    let pipeline = Pipeline::new(ScriptedExecutor::new(vec![partial]), CompactionConfig::default());

    let run = pipeline
        .run("go-test", &[], &ExecOptions::default(), Representation::Full)
        .await
        .expect("run");

    let data = &run.response.data;
    assert_eq!(data["context"]["timed_out"], true);
    assert_eq!(data["counts"]["running"], 1);
    assert_eq!(data["children"]["tests"][0]["status"], "running");
}

#[tokio::test]
async fn flag_values_never_reach_the_executor() {
    let pipeline = Pipeline::new(ScriptedExecutor::default(), CompactionConfig::default());
    let err = pipeline
        .run(
            "git-diff",
            &["--output=/tmp/pwned".to_string()],
            &ExecOptions::default(),
            Representation::Compact,
        )
        .await
        .expect_err("rejected");
    assert!(matches!(err, ExecError::InvalidArgument { .. }));
    assert!(pipeline.executor().calls().is_empty());
}

#[tokio::test]
async fn merge_conflict_then_abort() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join(".git")).expect("mkdir");

    let mut executor = ScriptedExecutor::new(vec![
        RawOutput::stdout(
            "Auto-merging src/a.ts\nCONFLICT (content): Merge conflict in src/a.ts\nAutomatic merge failed; fix conflicts and then commit the result.\n",
            1,
        ),
        RawOutput::stdout("", 0),
    ]);
    executor.side_effects = vec![(0, ".git/MERGE_HEAD", true), (1, ".git/MERGE_HEAD", false)];

    let mut driver = SessionDriver::new(executor, SessionKind::Merge, dir.path());
    let session = driver
        .step(SessionStep::Start, &["feature".to_string()])
        .await
        .expect("conflict is a state");
    assert_eq!(session.state, SessionState::Conflict);
    assert!(session.conflict_set.contains("src/a.ts"));

    let again = driver.step(SessionStep::Start, &["feature".to_string()]).await;
    assert!(matches!(again, Err(ExecError::Session(_))));

    let session = driver.step(SessionStep::Abort, &[]).await.expect("abort");
    assert_eq!(session.state, SessionState::Idle);
    assert_eq!(session.history.len(), 2);
}

#[tokio::test]
async fn status_from_fresh_driver_reports_conflict() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join(".git")).expect("mkdir");
    std::fs::write(dir.path().join(".git/MERGE_HEAD"), "abc\n").expect("write");

    let executor = ScriptedExecutor::new(vec![RawOutput::stdout("src/a.ts\nsrc/b.ts\n", 0)]);
    let mut driver = SessionDriver::new(executor, SessionKind::Merge, dir.path());

    let session = driver.status().await.expect("status");
    assert_eq!(session.state, SessionState::Conflict);
    assert_eq!(session.conflict_set.len(), 2);
    assert!(session.conflict_set.contains("src/b.ts"));

    let calls = driver.executor().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "git");
    assert_eq!(calls[0].1, UNMERGED_PATHS_ARGS.iter().map(|s| s.to_string()).collect::<Vec<_>>());
}

#[tokio::test]
async fn status_without_live_flow_runs_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join(".git")).expect("mkdir");

    let mut driver = SessionDriver::new(ScriptedExecutor::default(), SessionKind::Rebase, dir.path());
    let session = driver.status().await.expect("status");
    assert_eq!(session.state, SessionState::Idle);
    assert!(driver.executor().calls().is_empty());
}
