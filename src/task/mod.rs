use crate::exec::{CommandExecutionResult, DEFAULT_STEP_TIMEOUT};
use crate::plan::CommandPlan;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub mod orchestrator;
pub mod phases;
pub mod revision;

pub use orchestrator::{describe_execution_failure, execution_failure, TaskOrchestrator};
pub use phases::{Phase, PhaseFailure, PhaseLog, PhaseStatus, PhaseTracker};

/// A file attached to a task request: an upload, or a prior session's
/// output re-attached by the revision composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFile {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub media_type: String,
}

#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub task: String,
    pub files: Vec<AgentFile>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunTaskOptions {
    pub dry_run: bool,
    pub debug: bool,
    pub include_raw_response: bool,
    /// Working directory for spawned tools; defaults to the request's
    /// output directory.
    pub working_dir: Option<PathBuf>,
    pub public_root: Option<PathBuf>,
    pub step_timeout: Duration,
    pub binaries: BTreeMap<String, String>,
}

impl Default for RunTaskOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            debug: false,
            include_raw_response: false,
            working_dir: None,
            public_root: None,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            binaries: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub plan: CommandPlan,
    pub raw_plan: Value,
    pub result: CommandExecutionResult,
    pub phases: Vec<Phase>,
    pub debug: Option<Value>,
}

/// Whatever partial plan/result/diagnostic data existed when a task failed,
/// so the caller can still render diagnostics and offer retry-with-context
/// flows. Absent fields serialize as null.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskErrorContext {
    pub plan: Option<CommandPlan>,
    pub raw_plan: Option<Value>,
    pub result: Option<CommandExecutionResult>,
    pub debug: Option<Value>,
    pub response_text: Option<String>,
}

/// The only error type crossing the orchestration boundary. Carries the
/// complete phase history up to and including the failing phase, so a
/// caller can render which step failed and what was known at that point
/// without re-deriving it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TaskError {
    pub message: String,
    pub phases: Vec<Phase>,
    pub context: TaskErrorContext,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}
