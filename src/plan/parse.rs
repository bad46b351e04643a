use crate::plan::PlanError;
use serde_json::{Map, Value};

/// Extract the command plan object from raw planner text.
///
/// The planner is a language model; its response may wrap the plan in prose
/// or markdown fences, and the plan itself comes in one of two shapes: the
/// structured `{steps: [...]}` form, or the legacy flat single-command form
/// (`{command, arguments, ...}` with no `steps`). Both are normalized into
/// the canonical `{overview, followUp, steps}` object here, at the boundary,
/// so nothing downstream branches on shape.
pub fn parse_plan_text(text: &str) -> Result<Value, PlanError> {
    let body = extract_json_object(text).ok_or_else(|| PlanError::UnparseablePlan {
        reason: "no json object found in response".to_string(),
    })?;
    let value: Value =
        serde_json::from_str(&body).map_err(|err| PlanError::UnparseablePlan {
            reason: format!("invalid json: {err}"),
        })?;
    let object = value.as_object().ok_or_else(|| PlanError::UnparseablePlan {
        reason: "plan payload must be a json object".to_string(),
    })?;

    if object.contains_key("steps") {
        return Ok(value.clone());
    }
    if object.contains_key("command") {
        return Ok(wrap_legacy_single_command(object));
    }
    Err(PlanError::UnparseablePlan {
        reason: "object has neither `steps` nor `command`".to_string(),
    })
}

fn wrap_legacy_single_command(object: &Map<String, Value>) -> Value {
    let mut step = object.clone();
    let overview = step.remove("overview").unwrap_or(Value::String(String::new()));
    let follow_up = step
        .remove("followUp")
        .unwrap_or(Value::String(String::new()));
    let mut plan = Map::new();
    plan.insert("overview".to_string(), overview);
    plan.insert("followUp".to_string(), follow_up);
    plan.insert("steps".to_string(), Value::Array(vec![Value::Object(step)]));
    Value::Object(plan)
}

/// Locate the first balanced top-level json object in the text, skipping
/// markdown code fences. Brace matching respects string literals and
/// escapes, since ffmpeg filter arguments routinely contain braces.
fn extract_json_object(text: &str) -> Option<String> {
    let stripped = strip_code_fences(text);
    let start = stripped.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in stripped[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(stripped[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_info = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    match after_info.rfind("```") {
        Some(idx) => after_info[..idx].trim(),
        None => after_info.trim(),
    }
}
