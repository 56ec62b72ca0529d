//! Deployment job domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A build-and-run request extracted from one accepted webhook delivery.
///
/// Immutable after extraction; consumed by exactly one orchestrator task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Image repository name (`repo` query parameter).
    pub repo: String,
    /// Image tag (`tag` query parameter).
    pub tag: String,
    /// Source repository URL (`git_url` payload field).
    pub git_url: String,
    /// Branch derived from the payload's `refs/heads/{branch}` ref.
    pub branch: String,
    /// Optional subfolder within the repository (`folder` query parameter).
    pub folder: Option<String>,
}

impl BuildRequest {
    /// The `{repo}:{tag}` reference the image is built and run under.
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.repo, self.tag)
    }

    /// The git build context passed to the engine: `url#branch`, with a
    /// trailing `:folder` when a subfolder was requested.
    pub fn build_context(&self) -> String {
        match &self.folder {
            Some(folder) => format!("{}#{}:{}", self.git_url, self.branch, folder),
            None => format!("{}#{}", self.git_url, self.branch),
        }
    }
}

/// Deployment job record
///
/// Created when a webhook delivery is accepted, mutated only by the
/// orchestrator task that owns it, and dropped once a terminal state is
/// reached. There is no persisted job table: the event log is the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployJob {
    pub id: Uuid,
    pub request: BuildRequest,
    pub state: JobState,
    /// Exit code of the launched container, once it has terminated.
    pub exit_code: Option<i64>,
}

impl DeployJob {
    /// Creates a queued job for an accepted build request.
    pub fn new(request: BuildRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            state: JobState::Queued,
            exit_code: None,
        }
    }
}

/// Lifecycle state of a deployment job.
///
/// ```text
/// Queued -> Building -> StoppingOld -> Pruning -> Launching -> Monitoring
///              |                                                   |
///              +--> Failed (nonzero build)      (exit 0) Succeeded-+-> Failed (nonzero exit)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Building,
    StoppingOld,
    Pruning,
    Launching,
    Monitoring,
    Succeeded,
    Failed,
}

impl JobState {
    /// Whether the job has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Queued => "queued",
            JobState::Building => "building",
            JobState::StoppingOld => "stopping-old",
            JobState::Pruning => "pruning",
            JobState::Launching => "launching",
            JobState::Monitoring => "monitoring",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BuildRequest {
        BuildRequest {
            repo: "bot".to_string(),
            tag: "demo".to_string(),
            git_url: "git@host:org/repo.git".to_string(),
            branch: "main".to_string(),
            folder: None,
        }
    }

    #[test]
    fn test_image_ref() {
        assert_eq!(request().image_ref(), "bot:demo");
    }

    #[test]
    fn test_build_context_without_folder() {
        assert_eq!(request().build_context(), "git@host:org/repo.git#main");
    }

    #[test]
    fn test_build_context_with_folder() {
        let mut req = request();
        req.folder = Some("services/api".to_string());
        assert_eq!(req.build_context(), "git@host:org/repo.git#main:services/api");
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = DeployJob::new(request());
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.exit_code, None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Monitoring.is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(JobState::StoppingOld.to_string(), "stopping-old");
        assert_eq!(JobState::Succeeded.to_string(), "succeeded");
    }
}
