use crate::exec::{
    self, CommandExecutionResult, ExecutionObserver, ExecutionOptions, StepStatus,
};
use crate::planner::{PlanOptions, Planner};
use crate::shared::clock::now_millis;
use crate::shared::logging::append_task_log_line;
use crate::task::phases::{PhaseFailure, PhaseTracker};
use crate::task::{RunTaskOptions, TaskError, TaskErrorContext, TaskOutcome, TaskRequest};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

const PHASE_DEFINITIONS: &[(&str, &str)] = &[
    ("plan", "Plan commands"),
    ("execute", "Execute commands"),
    ("summarize", "Summarize results"),
];

/// Wraps the planning collaborator and the command executor into a single
/// `run_task` operation with phase tracking. All failures cross this
/// boundary as [`TaskError`].
pub struct TaskOrchestrator<'a> {
    planner: &'a dyn Planner,
    log_root: Option<PathBuf>,
    session_label: Option<String>,
}

impl<'a> TaskOrchestrator<'a> {
    pub fn new(planner: &'a dyn Planner) -> Self {
        Self {
            planner,
            log_root: None,
            session_label: None,
        }
    }

    /// Append phase transitions to `<root>/logs/tasks.log`.
    pub fn with_log_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.log_root = Some(root.into());
        self
    }

    pub fn with_session_label(mut self, label: impl Into<String>) -> Self {
        self.session_label = Some(label.into());
        self
    }

    pub fn run_task(
        &self,
        request: &TaskRequest,
        options: &RunTaskOptions,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<TaskOutcome, TaskError> {
        let mut tracker = PhaseTracker::new(PHASE_DEFINITIONS);

        tracker.start("plan");
        tracker.log("plan", format!("requesting plan for task ({} chars)", request.task.len()));
        self.log_transition("plan", "in_progress");
        let plan_options = PlanOptions {
            debug: options.debug,
            include_raw_response: options.include_raw_response,
        };
        let planned = match self.planner.plan(request, &plan_options) {
            Ok(planned) => planned,
            Err(err) => {
                tracker.fail(
                    "plan",
                    PhaseFailure {
                        message: err.message.clone(),
                        name: "PlannerError".to_string(),
                        detail: err.source.as_ref().map(|source| source.to_string()),
                    },
                    Map::new(),
                );
                self.log_transition("plan", "failed");
                let context = TaskErrorContext {
                    plan: None,
                    raw_plan: err.raw_plan.clone(),
                    result: None,
                    debug: err.debug.clone(),
                    response_text: err.response_text.clone(),
                };
                return Err(TaskError {
                    message: format!("task planning failed: {}", err.message),
                    phases: tracker.history_through("plan"),
                    context,
                    cause: Some(Box::new(err)),
                });
            }
        };

        let commands: Vec<Value> = planned
            .plan
            .steps
            .iter()
            .map(|step| Value::String(step.command.clone()))
            .collect();
        let mut plan_meta = Map::new();
        plan_meta.insert("steps".to_string(), json!(planned.plan.steps.len()));
        plan_meta.insert("commands".to_string(), Value::Array(commands));
        tracker.log(
            "plan",
            format!("planner returned {} step(s)", planned.plan.steps.len()),
        );
        tracker.succeed("plan", plan_meta);
        self.log_transition("plan", "success");

        tracker.start("execute");
        tracker.set_meta("execute", "dryRun", json!(options.dry_run));
        self.log_transition("execute", "in_progress");
        let exec_options = ExecutionOptions {
            working_dir: options
                .working_dir
                .clone()
                .unwrap_or_else(|| request.output_dir.clone()),
            public_root: options.public_root.clone(),
            dry_run: options.dry_run,
            step_timeout: options.step_timeout,
            binaries: options.binaries.clone(),
        };

        let raw_plan = planned
            .raw_plan
            .clone()
            .or_else(|| serde_json::to_value(&planned.plan).ok())
            .unwrap_or(Value::Null);

        let result = match exec::execute(&planned.plan, &exec_options, observer) {
            Ok(result) => result,
            Err(err) => {
                tracker.fail(
                    "execute",
                    PhaseFailure {
                        message: err.to_string(),
                        name: "ExecError".to_string(),
                        detail: None,
                    },
                    Map::new(),
                );
                self.log_transition("execute", "failed");
                let context = TaskErrorContext {
                    plan: Some(planned.plan.clone()),
                    raw_plan: Some(raw_plan),
                    result: None,
                    debug: planned.debug.clone(),
                    response_text: planned.response_text.clone(),
                };
                return Err(TaskError {
                    message: format!("command execution failed: {err}"),
                    phases: tracker.history_through("execute"),
                    context,
                    cause: Some(Box::new(err)),
                });
            }
        };

        // The executor does not throw for a step that ran and failed; that
        // is a logical failure detected here.
        if let Some(description) = execution_failure(&result) {
            tracker.fail(
                "execute",
                PhaseFailure {
                    message: description.clone(),
                    name: "CommandFailed".to_string(),
                    detail: None,
                },
                execution_summary_meta(&result),
            );
            self.log_transition("execute", "failed");
            let context = TaskErrorContext {
                plan: Some(planned.plan.clone()),
                raw_plan: Some(raw_plan),
                result: Some(result),
                debug: planned.debug.clone(),
                response_text: planned.response_text.clone(),
            };
            return Err(TaskError {
                message: description,
                phases: tracker.history_through("execute"),
                context,
                cause: None,
            });
        }
        tracker.succeed("execute", execution_summary_meta(&result));
        self.log_transition("execute", "success");

        tracker.start("summarize");
        let mut summary_meta = Map::new();
        summary_meta.insert(
            "resolvedOutputs".to_string(),
            json!(result.resolved_outputs.len()),
        );
        tracker.succeed("summarize", summary_meta);
        self.log_transition("summarize", "success");

        Ok(TaskOutcome {
            plan: planned.plan,
            raw_plan,
            result,
            phases: tracker.into_phases(),
            debug: planned.debug,
        })
    }

    fn log_transition(&self, phase: &str, status: &str) {
        let Some(root) = &self.log_root else {
            return;
        };
        let session = self.session_label.as_deref().unwrap_or("-");
        let line = format!(
            "ts={} session={session} phase={phase} status={status}",
            now_millis()
        );
        let _ = append_task_log_line(root, &line);
    }
}

fn step_failed(step: &crate::exec::CommandStepResult) -> bool {
    step.status == StepStatus::Executed
        && (step.timed_out || step.exit_code.is_some_and(|code| code != 0))
}

/// Whether the result represents a logical execution failure per the
/// failure taxonomy: top-level timeout, top-level nonzero exit, or any
/// executed step that timed out or exited nonzero.
pub fn execution_failure(result: &CommandExecutionResult) -> Option<String> {
    let failed = result.timed_out
        || result.exit_code.is_some_and(|code| code != 0)
        || result.steps.iter().any(step_failed);
    if !failed {
        return None;
    }
    Some(describe_execution_failure(result))
}

/// Human-readable failure description, in priority order: top-level
/// timeout, first failing executed step, top-level exit code, generic
/// fallback.
pub fn describe_execution_failure(result: &CommandExecutionResult) -> String {
    if result.timed_out {
        return "command execution timed out".to_string();
    }
    if let Some(step) = result.steps.iter().find(|step| step_failed(step)) {
        if step.timed_out {
            return format!("command `{}` timed out", step.command);
        }
        if let Some(code) = step.exit_code {
            return format!("command `{}` exited with code {code}", step.command);
        }
    }
    if let Some(code) = result.exit_code.filter(|code| *code != 0) {
        return format!("command sequence exited with code {code}");
    }
    "command execution failed".to_string()
}

fn execution_summary_meta(result: &CommandExecutionResult) -> Map<String, Value> {
    let executed = result
        .steps
        .iter()
        .filter(|step| step.status == StepStatus::Executed)
        .count();
    let mut meta = Map::new();
    meta.insert("executedSteps".to_string(), json!(executed));
    meta.insert(
        "skippedSteps".to_string(),
        json!(result.steps.len() - executed),
    );
    meta.insert("exitCode".to_string(), json!(result.exit_code));
    meta.insert("timedOut".to_string(), json!(result.timed_out));
    meta
}
