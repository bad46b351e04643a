use crate::exec::runner::run_step_process;
use crate::exec::{
    CommandExecutionResult, CommandStepResult, DescribedOutput, ExecError, ExecutionObserver,
    ExecutionOptions, SkipReason, StepStatus,
};
use crate::plan::{CommandPlan, CommandStepPlan};
use crate::tools::NO_OP_COMMAND;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Execute a validated plan's steps as an ordered sequence of subprocesses.
///
/// Steps run strictly one at a time, in plan order — later steps may depend
/// on files produced by earlier ones, and the combined transcript must be
/// deterministic. Returns `Err` only for transport-level problems (missing
/// binary, spawn failure); a step exiting nonzero or timing out is recorded
/// in the result, with every later step skipped as `previous_step_failed`.
pub fn execute(
    plan: &CommandPlan,
    options: &ExecutionOptions,
    observer: &mut dyn ExecutionObserver,
) -> Result<CommandExecutionResult, ExecError> {
    // Output directories are promised to exist after `execute` returns,
    // dry-run and skipped steps included.
    prepare_output_directories(plan)?;

    let mut steps: Vec<CommandStepResult> = Vec::with_capacity(plan.steps.len());
    let mut failed_so_far = false;

    for (index, step) in plan.steps.iter().enumerate() {
        if let Some(reason) = resolve_skip_reason(options.dry_run, failed_so_far, &step.command) {
            observer.on_command_skip(index, step, reason);
            steps.push(skipped_step_result(step, reason));
            continue;
        }

        observer.on_command_start(index, step);
        let binary = options
            .binaries
            .get(&step.command)
            .cloned()
            .unwrap_or_else(|| step.command.clone());
        let outcome = run_step_process(
            &step.command,
            &binary,
            &step.arguments,
            &options.working_dir,
            options.step_timeout,
            &mut |stream, chunk| observer.on_command_output(index, stream, chunk),
        )?;

        if outcome.timed_out || outcome.exit_code.is_some_and(|code| code != 0) {
            failed_so_far = true;
        }

        let result = CommandStepResult {
            status: StepStatus::Executed,
            command: step.command.clone(),
            arguments: step.arguments.clone(),
            reasoning: step.reasoning.clone(),
            exit_code: outcome.exit_code,
            timed_out: outcome.timed_out,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            skip_reason: None,
        };
        observer.on_command_end(index, &result);
        steps.push(result);
    }

    let last_executed = steps
        .iter()
        .rev()
        .find(|step| step.status == StepStatus::Executed);
    let exit_code = last_executed.and_then(|step| step.exit_code);
    let timed_out = last_executed.is_some_and(|step| step.timed_out);
    let dry_run = options.dry_run || last_executed.is_none();

    Ok(CommandExecutionResult {
        exit_code,
        timed_out,
        stdout: aggregate_transcript(&steps, |step| &step.stdout),
        stderr: aggregate_transcript(&steps, |step| &step.stderr),
        resolved_outputs: describe_outputs(plan, options.public_root.as_deref()),
        dry_run,
        steps,
    })
}

/// Skip precedence, first match wins: a global dry-run beats a prior
/// failure, which beats the no-op sentinel. Evaluated per step in a single
/// forward pass, so by the time a step is reached, `failed_so_far` already
/// reflects every strictly earlier step.
fn resolve_skip_reason(dry_run: bool, failed_so_far: bool, command: &str) -> Option<SkipReason> {
    if dry_run {
        Some(SkipReason::DryRun)
    } else if failed_so_far {
        Some(SkipReason::PreviousStepFailed)
    } else if command == NO_OP_COMMAND {
        Some(SkipReason::NoOpCommand)
    } else {
        None
    }
}

fn skipped_step_result(step: &CommandStepPlan, reason: SkipReason) -> CommandStepResult {
    CommandStepResult {
        status: StepStatus::Skipped,
        command: step.command.clone(),
        arguments: step.arguments.clone(),
        reasoning: step.reasoning.clone(),
        exit_code: None,
        timed_out: false,
        stdout: String::new(),
        stderr: String::new(),
        skip_reason: Some(reason),
    }
}

/// Combined transcript: executed steps with non-empty content, in step
/// order, each block prefixed with a `[step N] <command> <args>` header so
/// the concatenation stays attributable.
fn aggregate_transcript<'a>(
    steps: &'a [CommandStepResult],
    pick: impl Fn(&'a CommandStepResult) -> &'a str,
) -> String {
    let mut blocks = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        if step.status != StepStatus::Executed {
            continue;
        }
        let content = pick(step);
        if content.is_empty() {
            continue;
        }
        let mut header = format!("[step {}] {}", index + 1, step.command);
        if !step.arguments.is_empty() {
            header.push(' ');
            header.push_str(&step.arguments.join(" "));
        }
        blocks.push(format!("{header}\n{}", content.trim_end()));
    }
    blocks.join("\n")
}

/// Stat every declared output across all steps (duplicates deliberately
/// kept — the list mirrors the plan's declarations one-to-one).
pub fn describe_outputs(plan: &CommandPlan, public_root: Option<&Path>) -> Vec<DescribedOutput> {
    let mut described = Vec::new();
    for step in &plan.steps {
        for output in &step.outputs {
            let absolute = PathBuf::from(&output.path);
            let metadata = fs::metadata(&absolute).ok().filter(|m| m.is_file());
            let exists = metadata.is_some();
            let size = metadata.as_ref().map(|m| m.len());
            let public_path = if exists {
                public_root.and_then(|root| public_relative_path(root, &absolute))
            } else {
                None
            };
            described.push(DescribedOutput {
                path: output.path.clone(),
                description: output.description.clone(),
                absolute_path: absolute.display().to_string(),
                exists,
                size,
                public_path,
            });
        }
    }
    described
}

fn public_relative_path(root: &Path, absolute: &Path) -> Option<String> {
    let relative = absolute.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

fn prepare_output_directories(plan: &CommandPlan) -> Result<(), ExecError> {
    let mut parents = BTreeSet::new();
    for step in &plan.steps {
        for output in &step.outputs {
            if let Some(parent) = Path::new(&output.path).parent() {
                parents.insert(parent.to_path_buf());
            }
        }
    }
    for parent in parents {
        fs::create_dir_all(&parent).map_err(|err| ExecError::Io {
            path: parent.display().to_string(),
            source: err,
        })?;
    }
    Ok(())
}
