//! Deployment orchestrator
//!
//! Drives one container job through its lifecycle:
//!
//! ```text
//! Queued -> Building -> StoppingOld -> Pruning -> Launching -> Monitoring
//! ```
//!
//! Every state transition, engine invocation, and captured command output is
//! appended to the event log. The webhook acknowledgement has already been
//! sent by the time any of this runs, so failures here are terminal for the
//! job and observable only through the log tail. There is no retry: a human
//! or the next webhook delivery triggers again.

use anyhow::Result;
use slipway_core::domain::job::{BuildRequest, DeployJob, JobState};
use slipway_core::domain::log::LogLevel;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

use crate::config::Config;
use crate::engine::{ContainerEngine, EngineOutput, EngineProcess, argv};
use crate::store::LogStore;

/// Drives one job at a time; the dispatcher builds a fresh instance per
/// accepted webhook and spawns `start` detached.
pub struct Orchestrator {
    engine: Arc<dyn ContainerEngine>,
    store: Arc<LogStore>,
    poll_initial: Duration,
    poll_steady: Duration,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn ContainerEngine>, store: Arc<LogStore>, config: &Config) -> Self {
        Self {
            engine,
            store,
            poll_initial: config.poll_initial,
            poll_steady: config.poll_steady,
        }
    }

    /// Drives one job to a terminal state and returns its final record.
    ///
    /// Overlapping starts for the same (repo, tag) are not serialized here:
    /// the unconditional stop-all pass before each launch makes the engine
    /// the arbiter of what ends up running.
    pub async fn start(&self, request: BuildRequest) -> DeployJob {
        let mut job = DeployJob::new(request);

        info!("Job {} started: deploying {}", job.id, job.request.image_ref());
        self.store.info(&format!(
            "Job {} accepted: build {} from {}",
            job.id,
            job.request.image_ref(),
            job.request.build_context()
        ));

        match self.drive(&mut job).await {
            Ok(()) => {
                info!("Job {} finished: {}", job.id, job.state);
            }
            Err(err) => {
                self.transition(&mut job, JobState::Failed);
                error!("Job {} aborted: {:#}", job.id, err);
                self.store.error(&format!("Job {} aborted: {:#}", job.id, err));
            }
        }

        job
    }

    /// Runs the state sequence. A nonzero build or container exit settles
    /// the job as failed via `Ok(())`; an `Err` means the engine itself
    /// could not be driven (binary missing, spawn failure).
    async fn drive(&self, job: &mut DeployJob) -> Result<()> {
        let image = job.request.image_ref();

        self.transition(job, JobState::Building);
        let build = self
            .invoke_logged(argv(&["build", "--tag", &image, &job.request.build_context()]))
            .await?;
        if !build.success() {
            self.transition(job, JobState::Failed);
            self.store
                .error(&format!("Job {}: image build failed; job abandoned", job.id));
            return Ok(());
        }

        self.transition(job, JobState::StoppingOld);
        self.stop_existing().await?;

        self.transition(job, JobState::Pruning);
        self.invoke_logged(argv(&["container", "prune", "-f"])).await?;

        self.transition(job, JobState::Launching);
        let run_args = argv(&["run", &image]);
        self.store.info(&format!(
            "Calling engine: {} {}",
            self.engine.program(),
            run_args.join(" ")
        ));
        let mut process = self.engine.spawn(run_args).await?;

        self.transition(job, JobState::Monitoring);
        let code = self.monitor(process.as_mut()).await?;
        job.exit_code = Some(i64::from(code));

        if code == 0 {
            self.transition(job, JobState::Succeeded);
            self.store
                .info(&format!("Job {}: container exited cleanly", job.id));
        } else {
            self.transition(job, JobState::Failed);
            self.store.error(&format!(
                "Job {}: container exited with code {}",
                job.id, code
            ));
        }

        Ok(())
    }

    /// Stops and waits out every container the engine knows about, not just
    /// ones belonging to this job. Single-tenant-host policy: the host runs
    /// whatever was deployed last, and the engine is the source of truth
    /// for what is currently up.
    async fn stop_existing(&self) -> Result<()> {
        let listing = self.invoke_logged(argv(&["container", "ls", "-aq"])).await?;

        for id in listing
            .stdout
            .lines()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            self.invoke_logged(argv(&["container", "stop", id])).await?;
            self.invoke_logged(argv(&["container", "wait", id])).await?;
        }

        Ok(())
    }

    /// Polls the launched process until it reports an exit code: one short
    /// delay right after launch to catch instant crashes, then the longer
    /// steady cadence.
    async fn monitor(&self, process: &mut dyn EngineProcess) -> Result<i32> {
        time::sleep(self.poll_initial).await;

        loop {
            if let Some(code) = process.try_wait()? {
                return Ok(code);
            }
            time::sleep(self.poll_steady).await;
        }
    }

    /// Runs one engine subcommand, recording the call and what it printed.
    /// Captured stdout of a successful call becomes one record; a nonzero
    /// exit appends its stderr lines under an error record. The nonzero
    /// exit is returned, not raised: only the caller knows which steps are
    /// fatal (stop/wait/prune failures are logged and tolerated).
    async fn invoke_logged(&self, args: Vec<String>) -> Result<EngineOutput> {
        self.store.info(&format!(
            "Calling engine: {} {}",
            self.engine.program(),
            args.join(" ")
        ));

        let output = self.engine.invoke(args).await?;

        if output.success() {
            let stdout = output.stdout.trim_end();
            if !stdout.is_empty() {
                self.store.info(stdout);
            }
        } else {
            let stderr = output.stderr.trim_end();
            let message = if stderr.is_empty() {
                format!("Engine command failed with exit code {}", output.code)
            } else {
                format!(
                    "Engine command failed with exit code {}\n{}",
                    output.code, stderr
                )
            };
            self.store.error(&message);
        }

        Ok(output)
    }

    fn transition(&self, job: &mut DeployJob, state: JobState) {
        job.state = state;
        let level = if state == JobState::Failed {
            LogLevel::Error
        } else {
            LogLevel::Info
        };
        self.store
            .append(level, &format!("Job {} -> {}", job.id, state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeEngine;

    fn test_config() -> Config {
        Config {
            poll_initial: Duration::from_millis(1),
            poll_steady: Duration::from_millis(1),
            ..Config::default()
        }
    }

    fn request() -> BuildRequest {
        BuildRequest {
            repo: "bot".to_string(),
            tag: "demo".to_string(),
            git_url: "git@host:org/repo.git".to_string(),
            branch: "main".to_string(),
            folder: None,
        }
    }

    fn test_store() -> (tempfile::TempDir, Arc<LogStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LogStore::new(dir.path().join("events.log"), 64 * 1024));
        (dir, store)
    }

    fn primaries(store: &LogStore) -> Vec<String> {
        store
            .tail(100)
            .into_iter()
            .map(|record| record.primary)
            .collect()
    }

    #[tokio::test]
    async fn test_successful_deploy_runs_full_engine_sequence() {
        let engine = Arc::new(FakeEngine::new());
        engine.containers(&["c1", "c2"]);
        let (_dir, store) = test_store();
        let orchestrator = Orchestrator::new(engine.clone(), store, &test_config());

        let job = orchestrator.start(request()).await;

        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.exit_code, Some(0));
        assert_eq!(
            engine.invocations(),
            vec![
                argv(&["build", "--tag", "bot:demo", "git@host:org/repo.git#main"]),
                argv(&["container", "ls", "-aq"]),
                argv(&["container", "stop", "c1"]),
                argv(&["container", "wait", "c1"]),
                argv(&["container", "stop", "c2"]),
                argv(&["container", "wait", "c2"]),
                argv(&["container", "prune", "-f"]),
                argv(&["run", "bot:demo"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_build_failure_never_launches() {
        let engine = Arc::new(FakeEngine::new());
        engine.fail("build", 1, "Step 3/7 : RUN make\nmake: *** error 2");
        let (_dir, store) = test_store();
        let orchestrator = Orchestrator::new(engine.clone(), store.clone(), &test_config());

        let job = orchestrator.start(request()).await;

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.exit_code, None);
        // The build is the only engine call: no listing, no prune, no run.
        assert_eq!(engine.invocations().len(), 1);

        let lines = primaries(&store);
        assert!(lines.iter().any(|l| l.contains("image build failed")));
        assert!(!lines.iter().any(|l| l.contains("-> launching")));
        assert!(!lines.iter().any(|l| l.contains("-> monitoring")));

        // Captured stderr lines ride along as one multi-line record.
        let failure = store
            .tail(100)
            .into_iter()
            .find(|r| r.primary.contains("Engine command failed"))
            .unwrap();
        assert_eq!(failure.continuation.len(), 2);
        assert!(failure.continuation[0].contains("RUN make"));
        assert!(failure.continuation[1].contains("error 2"));
    }

    #[tokio::test]
    async fn test_run_failure_reaches_monitoring_then_failed() {
        let engine = Arc::new(FakeEngine::new());
        engine.script_run(3, 2);
        let (_dir, store) = test_store();
        let orchestrator = Orchestrator::new(engine, store.clone(), &test_config());

        let job = orchestrator.start(request()).await;

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.exit_code, Some(3));

        let lines = primaries(&store);
        assert!(lines.iter().any(|l| l.contains("-> monitoring")));
        assert!(lines.iter().any(|l| l.contains("exited with code 3")));
        assert!(!lines.iter().any(|l| l.contains("-> succeeded")));
    }

    #[tokio::test]
    async fn test_stop_failure_is_tolerated() {
        let engine = Arc::new(FakeEngine::new());
        engine.containers(&["c1"]);
        engine.fail("container stop", 1, "cannot stop container c1");
        let (_dir, store) = test_store();
        let orchestrator = Orchestrator::new(engine.clone(), store, &test_config());

        let job = orchestrator.start(request()).await;

        // Stop/wait/prune are best effort; only build and run are fatal.
        assert_eq!(job.state, JobState::Succeeded);
        let calls = engine.invocations();
        assert!(calls.contains(&argv(&["run", "bot:demo"])));
    }

    #[tokio::test]
    async fn test_subfolder_lands_in_build_context() {
        let engine = Arc::new(FakeEngine::new());
        let (_dir, store) = test_store();
        let orchestrator = Orchestrator::new(engine.clone(), store, &test_config());

        let mut req = request();
        req.folder = Some("services/api".to_string());
        orchestrator.start(req).await;

        assert_eq!(
            engine.invocations()[0],
            argv(&[
                "build",
                "--tag",
                "bot:demo",
                "git@host:org/repo.git#main:services/api"
            ])
        );
    }

    #[tokio::test]
    async fn test_lifecycle_is_traced_in_order() {
        let engine = Arc::new(FakeEngine::new());
        let (_dir, store) = test_store();
        let orchestrator = Orchestrator::new(engine, store.clone(), &test_config());

        orchestrator.start(request()).await;

        let lines = primaries(&store);
        let position = |needle: &str| {
            lines
                .iter()
                .position(|l| l.contains(needle))
                .unwrap_or_else(|| panic!("missing log line: {}", needle))
        };

        assert!(position("accepted") < position("-> building"));
        assert!(position("-> building") < position("-> stopping-old"));
        assert!(position("-> stopping-old") < position("-> pruning"));
        assert!(position("-> pruning") < position("-> launching"));
        assert!(position("-> launching") < position("-> monitoring"));
        assert!(position("-> monitoring") < position("-> succeeded"));
    }
}
