use serde::{Deserialize, Serialize};

pub mod parse;
pub mod validate;

pub use parse::parse_plan_text;
pub use validate::validate_plan;

/// A validated, canonical command plan. Produced by [`validate_plan`] from
/// untrusted planner output; treated as immutable during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandPlan {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub follow_up: String,
    pub steps: Vec<CommandStepPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStepPlan {
    pub command: String,
    pub arguments: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub outputs: Vec<CommandOutputPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A file a step is expected to produce. `path` is absolute after
/// validation; existence is only checked after execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutputPlan {
    pub path: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("planner response did not contain a command plan object: {reason}")]
    UnparseablePlan { reason: String },
    #[error("plan must be a json object")]
    NotAnObject,
    #[error("output directory must not be empty")]
    EmptyOutputDir,
    #[error("plan is missing a `steps` array")]
    MissingSteps,
    #[error("plan `steps` must not be empty")]
    EmptySteps,
    #[error("step {index} must be a json object")]
    StepNotAnObject { index: usize },
    #[error("step {index} `command` must be a string naming a known tool")]
    InvalidCommand { index: usize },
    #[error("step {index} references unknown command `{command}`")]
    UnknownCommand { index: usize, command: String },
    #[error("step {index} `arguments` must be an array of strings")]
    ArgumentsNotStringArray { index: usize },
    #[error("step {index} declares an output with an empty path")]
    EmptyOutputPath { index: usize },
    #[error("step {index} output path `{path}` escapes the output directory")]
    OutputPathEscape { index: usize, path: String },
    #[error("path `{path}` cannot be normalized: {reason}")]
    PathNormalization { path: String, reason: String },
}
