use crate::plan::{CommandOutputPlan, CommandPlan, CommandStepPlan, PlanError};
use crate::tools::ToolRegistry;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Normalize and validate an untrusted plan structure against the tool
/// registry and the target output directory. This is the hard boundary
/// against planner hallucination: anything that passes is executable as-is.
///
/// Malformed optional fields are coerced (`overview`, `followUp`,
/// `reasoning` become empty strings); structural violations are rejected
/// with distinct errors. Every declared output path is resolved to absolute
/// form and must stay inside `output_dir` — the sole security boundary
/// between planner output and the filesystem.
///
/// Validation is idempotent: running a validated plan through again yields
/// an identical result.
pub fn validate_plan(
    registry: &ToolRegistry,
    raw: &Value,
    output_dir: &Path,
) -> Result<CommandPlan, PlanError> {
    let object = raw.as_object().ok_or(PlanError::NotAnObject)?;
    if output_dir.as_os_str().is_empty() {
        return Err(PlanError::EmptyOutputDir);
    }
    let raw_steps = object
        .get("steps")
        .and_then(Value::as_array)
        .ok_or(PlanError::MissingSteps)?;
    if raw_steps.is_empty() {
        return Err(PlanError::EmptySteps);
    }

    let canonical_dir = resolve_against_cwd(output_dir)?;

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw_step) in raw_steps.iter().enumerate() {
        steps.push(validate_step(registry, raw_step, index, &canonical_dir)?);
    }

    Ok(CommandPlan {
        overview: string_or_empty(object.get("overview")),
        follow_up: string_or_empty(object.get("followUp")),
        steps,
    })
}

fn validate_step(
    registry: &ToolRegistry,
    raw: &Value,
    index: usize,
    canonical_dir: &Path,
) -> Result<CommandStepPlan, PlanError> {
    let object = raw
        .as_object()
        .ok_or(PlanError::StepNotAnObject { index })?;

    let command = object
        .get("command")
        .and_then(Value::as_str)
        .ok_or(PlanError::InvalidCommand { index })?;
    if !registry.has_command(command) {
        return Err(PlanError::UnknownCommand {
            index,
            command: command.to_string(),
        });
    }

    let raw_arguments = object
        .get("arguments")
        .and_then(Value::as_array)
        .ok_or(PlanError::ArgumentsNotStringArray { index })?;
    let mut arguments = Vec::with_capacity(raw_arguments.len());
    for argument in raw_arguments {
        // Non-string elements are a hard error, not coerced: argument order
        // and exact text are significant to the spawned CLI.
        let text = argument
            .as_str()
            .ok_or(PlanError::ArgumentsNotStringArray { index })?;
        arguments.push(text.to_string());
    }

    let raw_outputs = object
        .get("outputs")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut outputs = Vec::with_capacity(raw_outputs.len());
    for raw_output in &raw_outputs {
        outputs.push(validate_output(raw_output, index, canonical_dir)?);
    }

    Ok(CommandStepPlan {
        command: command.to_string(),
        arguments,
        reasoning: string_or_empty(object.get("reasoning")),
        outputs,
        id: trimmed_optional(object.get("id")),
        title: trimmed_optional(object.get("title")),
        note: trimmed_optional(object.get("note")),
    })
}

fn validate_output(
    raw: &Value,
    index: usize,
    canonical_dir: &Path,
) -> Result<CommandOutputPlan, PlanError> {
    let path_text = raw
        .get("path")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if path_text.is_empty() {
        return Err(PlanError::EmptyOutputPath { index });
    }

    let declared = Path::new(path_text);
    let resolved = if declared.is_absolute() {
        normalize_absolute_path(declared)?
    } else {
        normalize_absolute_path(&canonical_dir.join(declared))?
    };
    if resolved.strip_prefix(canonical_dir).is_err() {
        return Err(PlanError::OutputPathEscape {
            index,
            path: path_text.to_string(),
        });
    }

    Ok(CommandOutputPlan {
        path: resolved.display().to_string(),
        description: string_or_empty(raw.get("description")),
    })
}

fn string_or_empty(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn trimmed_optional(value: Option<&Value>) -> Option<String> {
    let trimmed = value.and_then(Value::as_str)?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_against_cwd(path: &Path) -> Result<PathBuf, PlanError> {
    if path.is_absolute() {
        return normalize_absolute_path(path);
    }
    let cwd = std::env::current_dir().map_err(|err| PlanError::PathNormalization {
        path: path.display().to_string(),
        reason: format!("working directory unavailable: {err}"),
    })?;
    normalize_absolute_path(&cwd.join(path))
}

/// Lexical normalization: collapse `.` and `..` without touching the
/// filesystem, since declared outputs usually do not exist yet.
fn normalize_absolute_path(path: &Path) -> Result<PathBuf, PlanError> {
    if !path.is_absolute() {
        return Err(PlanError::PathNormalization {
            path: path.display().to_string(),
            reason: "path must be absolute".to_string(),
        });
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(v) => normalized.push(v),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(PlanError::PathNormalization {
                        path: path.display().to_string(),
                        reason: "path escapes filesystem root".to_string(),
                    });
                }
            }
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
        }
    }
    Ok(normalized)
}
