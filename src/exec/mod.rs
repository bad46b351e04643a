use crate::plan::CommandStepPlan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub mod executor;
pub mod runner;

pub use executor::{describe_outputs, execute};

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Executed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DryRun,
    PreviousStepFailed,
    NoOpCommand,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::DryRun => "dry_run",
            SkipReason::PreviousStepFailed => "previous_step_failed",
            SkipReason::NoOpCommand => "no_op_command",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Outcome of one plan step. Appended in plan order; immutable once
/// recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStepResult {
    pub status: StepStatus,
    pub command: String,
    pub arguments: Vec<String>,
    pub reasoning: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

/// A declared output annotated post-execution with what the filesystem says
/// about it. `public_path` is a forward-slash relative path under the
/// configured public root, for building download links; `None` when the
/// file does not exist, falls outside the root, or no root is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribedOutput {
    pub path: String,
    pub description: String,
    pub absolute_path: String,
    pub exists: bool,
    pub size: Option<u64>,
    pub public_path: Option<String>,
}

/// Aggregate result of executing a plan.
///
/// Top-level `exit_code`/`timed_out` mirror the most recently *executed*
/// step — not a worst-of aggregate — so a mid-sequence failure followed by
/// trailing skips still reports the failing step's code. Callers asking
/// "did anything fail" must use
/// [`crate::task::orchestrator::execution_failure`] rather than these
/// fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecutionResult {
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub resolved_outputs: Vec<DescribedOutput>,
    pub dry_run: bool,
    pub steps: Vec<CommandStepResult>,
}

#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Working directory for spawned tools.
    pub working_dir: PathBuf,
    /// Root under which outputs get a web-relative `public_path`.
    pub public_root: Option<PathBuf>,
    /// Preview mode: skip every step, but still prepare output directories.
    pub dry_run: bool,
    /// Wall-clock bound per subprocess; expired processes are killed.
    pub step_timeout: Duration,
    /// Tool id -> binary, from [`crate::tools::resolve_tool_binaries`].
    pub binaries: BTreeMap<String, String>,
}

impl ExecutionOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            public_root: None,
            dry_run: false,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            binaries: BTreeMap::new(),
        }
    }
}

/// Push-based progress hooks, invoked synchronously as steps advance. This
/// is the sole live-observation mechanism; the executor knows nothing about
/// any streaming transport behind the observer.
pub trait ExecutionObserver {
    fn on_command_start(&mut self, _index: usize, _step: &CommandStepPlan) {}
    fn on_command_output(&mut self, _index: usize, _stream: OutputStream, _chunk: &str) {}
    fn on_command_skip(&mut self, _index: usize, _step: &CommandStepPlan, _reason: SkipReason) {}
    fn on_command_end(&mut self, _index: usize, _result: &CommandStepResult) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ExecutionObserver for NullObserver {}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("command binary missing for `{command}`: {binary}")]
    MissingBinary { command: String, binary: String },
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
