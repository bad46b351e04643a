use crate::plan::CommandPlan;
use crate::task::TaskRequest;
use serde_json::Value;

pub mod client;
pub mod prompt;

pub use client::HttpPlanner;
pub use prompt::render_planning_prompt;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    pub debug: bool,
    pub include_raw_response: bool,
}

#[derive(Debug, Clone)]
pub struct PlannerOutput {
    /// The validated plan.
    pub plan: CommandPlan,
    /// Pre-validation plan object, as parsed from the model response.
    pub raw_plan: Option<Value>,
    pub debug: Option<Value>,
    pub response_text: Option<String>,
}

/// Typed planning failure. Diagnostic payloads (partial raw plan, debug
/// info, raw response text) are explicit optional fields here rather than
/// ad hoc properties tacked onto a generic error; absent simply means "no
/// partial data available".
#[derive(Debug, Default, thiserror::Error)]
#[error("{message}")]
pub struct PlannerError {
    pub message: String,
    pub raw_plan: Option<Value>,
    pub debug: Option<Value>,
    pub response_text: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PlannerError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_response_text(mut self, response_text: impl Into<String>) -> Self {
        self.response_text = Some(response_text.into());
        self
    }

    pub fn with_raw_plan(mut self, raw_plan: Value) -> Self {
        self.raw_plan = Some(raw_plan);
        self
    }

    pub fn with_debug(mut self, debug: Value) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// The planning collaborator: turns a task request into a validated command
/// plan. The bundled implementation is [`HttpPlanner`]; tests substitute
/// their own.
pub trait Planner {
    fn plan(
        &self,
        request: &TaskRequest,
        options: &PlanOptions,
    ) -> Result<PlannerOutput, PlannerError>;
}
