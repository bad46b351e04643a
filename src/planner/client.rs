use crate::config::PlannerSettings;
use crate::plan::{parse_plan_text, validate_plan};
use crate::planner::prompt::{render_planning_prompt, PLANNER_SYSTEM_PROMPT};
use crate::planner::{PlanOptions, Planner, PlannerError, PlannerOutput};
use crate::task::TaskRequest;
use crate::tools::ToolRegistry;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionEnvelope {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Planner backed by an OpenAI-compatible chat-completions endpoint. The
/// model's text response is parsed and validated here, so a successful
/// `plan` call always yields an executable plan.
#[derive(Debug, Clone)]
pub struct HttpPlanner {
    api_base: String,
    api_key: String,
    model: String,
    registry: ToolRegistry,
}

impl HttpPlanner {
    pub fn new(settings: &PlannerSettings, registry: ToolRegistry) -> Result<Self, PlannerError> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            PlannerError::message(format!(
                "planner api key environment variable `{}` is not set",
                settings.api_key_env
            ))
        })?;
        Ok(Self {
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
            registry,
        })
    }

    fn request_completion(&self, prompt: &str) -> Result<String, PlannerError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": PLANNER_SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
        });

        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(|err| match err {
                ureq::Error::Status(code, response) => {
                    let detail = response.into_string().unwrap_or_default();
                    PlannerError::message(format!("planner request failed with status {code}"))
                        .with_response_text(detail)
                }
                other => PlannerError::message(format!("planner request failed: {other}")),
            })?;

        let envelope: ChatCompletionEnvelope = response
            .into_json()
            .map_err(|err| PlannerError::message("planner response was not valid json").with_source(err))?;
        let content = envelope
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(PlannerError::message("planner response contained no content"));
        }
        Ok(content)
    }
}

impl Planner for HttpPlanner {
    fn plan(
        &self,
        request: &TaskRequest,
        options: &PlanOptions,
    ) -> Result<PlannerOutput, PlannerError> {
        let prompt = render_planning_prompt(&self.registry, request);
        let content = self.request_completion(&prompt)?;

        let debug = options.debug.then(|| {
            json!({
                "model": self.model,
                "apiBase": self.api_base,
                "promptChars": prompt.len(),
                "responseChars": content.len(),
            })
        });

        let raw_plan = parse_plan_text(&content).map_err(|err| {
            let mut planner_err = PlannerError::message(format!("plan parse failed: {err}"))
                .with_response_text(content.clone())
                .with_source(err);
            if let Some(debug) = debug.clone() {
                planner_err = planner_err.with_debug(debug);
            }
            planner_err
        })?;

        let plan =
            validate_plan(&self.registry, &raw_plan, &request.output_dir).map_err(|err| {
                let mut planner_err =
                    PlannerError::message(format!("plan validation failed: {err}"))
                        .with_raw_plan(raw_plan.clone())
                        .with_response_text(content.clone())
                        .with_source(err);
                if let Some(debug) = debug.clone() {
                    planner_err = planner_err.with_debug(debug);
                }
                planner_err
            })?;

        Ok(PlannerOutput {
            plan,
            raw_plan: Some(raw_plan),
            debug,
            response_text: options.include_raw_response.then_some(content),
        })
    }
}
