use crate::app::cli::{help_text, parse_cli_verb, parse_run_args, CliVerb, RunArgs};
use crate::config::{
    default_settings_path, load_settings, save_settings, validate_settings, Settings,
};
use crate::exec::{
    CommandStepResult, ExecutionObserver, OutputStream, SkipReason,
};
use crate::plan::CommandStepPlan;
use crate::planner::HttpPlanner;
use crate::session::{Complaint, SessionRecord, SessionStatus, SessionStore};
use crate::shared::clock::now_millis;
use crate::shared::ids::stable_file_id;
use crate::shared::mime::media_type_for_path;
use crate::task::revision::compose_revision;
use crate::task::{
    AgentFile, RunTaskOptions, TaskError, TaskOrchestrator, TaskOutcome, TaskRequest,
};
use crate::tools::{resolve_tool_binaries, ToolRegistry};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let Some(verb) = args.first() else {
        return Ok(help_text());
    };
    let rest = &args[1..];
    match parse_cli_verb(verb) {
        CliVerb::Setup => handle_setup(),
        CliVerb::Run => handle_run(rest),
        CliVerb::Revise => handle_revise(rest),
        CliVerb::Tools => handle_tools(),
        CliVerb::Show => handle_show(rest),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{verb}`\n\n{}", help_text())),
    }
}

fn handle_setup() -> Result<String, String> {
    let path = default_settings_path().map_err(|err| err.to_string())?;
    if path.is_file() {
        return Ok(format!("settings already exist at {}", path.display()));
    }
    let state_root = path
        .parent()
        .map(|parent| parent.join("state"))
        .ok_or("cannot derive state root from settings path")?;
    let settings = Settings::with_state_root(&state_root);
    save_settings(&path, &settings).map_err(|err| err.to_string())?;
    fs::create_dir_all(&state_root).map_err(|err| err.to_string())?;
    Ok(format!("wrote settings to {}", path.display()))
}

fn handle_tools() -> Result<String, String> {
    let registry = ToolRegistry::builtin();
    let mut lines = vec!["Available commands:".to_string()];
    for tool in registry.executable_tools() {
        lines.push(format!("  {:10} {}: {}", tool.id, tool.title, tool.description));
    }
    Ok(lines.join("\n"))
}

fn handle_show(args: &[String]) -> Result<String, String> {
    let session_id = args.first().ok_or("show requires a session id")?;
    let settings = load_cli_settings()?;
    let store = SessionStore::new(&settings.state_root);
    let record = store
        .load_session(session_id)
        .map_err(|err| err.to_string())?;
    serde_json::to_string_pretty(&record).map_err(|err| err.to_string())
}

fn handle_run(args: &[String]) -> Result<String, String> {
    let parsed = parse_run_args(args)?;
    let settings = load_cli_settings()?;
    let files = attach_cli_files(&parsed.files)?;
    let request = TaskRequest {
        task: parsed.task.clone(),
        files,
        output_dir: PathBuf::from(&parsed.output_dir),
    };
    run_session(&settings, request, &parsed, None, None)
}

fn handle_revise(args: &[String]) -> Result<String, String> {
    let session_id = args.first().ok_or("revise requires a session id")?;
    let complaint = args[1..].join(" ");
    if complaint.trim().is_empty() {
        return Err("revise requires a complaint".to_string());
    }

    let settings = load_cli_settings()?;
    let store = SessionStore::new(&settings.state_root);
    let mut base = store
        .load_session(session_id)
        .map_err(|err| err.to_string())?;

    base.complaints.push(Complaint {
        at: now_millis(),
        message: complaint.clone(),
    });
    store.persist_session(&base).map_err(|err| err.to_string())?;

    let revision = compose_revision(&store, &base, &complaint);
    let output_dir = base
        .request_options
        .get("outputDir")
        .and_then(|value| value.as_str())
        .ok_or("base session does not record an output directory")?
        .to_string();

    let parsed = RunArgs {
        task: revision.task.clone(),
        output_dir,
        files: Vec::new(),
        dry_run: false,
        debug: false,
        raw_response: false,
    };
    let request = TaskRequest {
        task: revision.task,
        files: revision.files,
        output_dir: PathBuf::from(&parsed.output_dir),
    };
    run_session(
        &settings,
        request,
        &parsed,
        Some(base.id.clone()),
        Some(complaint),
    )
}

fn run_session(
    settings: &Settings,
    request: TaskRequest,
    parsed: &RunArgs,
    parent_session_id: Option<String>,
    complaint_context: Option<String>,
) -> Result<String, String> {
    let registry = ToolRegistry::builtin();
    let store = SessionStore::new(&settings.state_root);
    let now = now_millis();
    let session_id = store
        .allocate_session_id(now)
        .map_err(|err| err.to_string())?;

    let mut record = SessionRecord::new(&session_id, &request.task, now);
    record.uploaded_files = request.files.clone();
    record.parent_session_id = parent_session_id;
    record.complaint_context = complaint_context;
    record.request_options = json!({
        "outputDir": request.output_dir.display().to_string(),
        "dryRun": parsed.dry_run,
        "debug": parsed.debug,
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    record.status = SessionStatus::Planning;
    store.persist_session(&record).map_err(|err| err.to_string())?;

    let planner =
        HttpPlanner::new(&settings.planner, registry.clone()).map_err(|err| err.to_string())?;
    let orchestrator = TaskOrchestrator::new(&planner)
        .with_log_root(&settings.state_root)
        .with_session_label(&session_id);

    let options = RunTaskOptions {
        dry_run: parsed.dry_run,
        debug: parsed.debug,
        include_raw_response: parsed.raw_response,
        working_dir: None,
        public_root: settings.public_root.clone(),
        step_timeout: Duration::from_secs(settings.step_timeout_seconds),
        binaries: resolve_tool_binaries(&registry, &settings.tool_binaries),
    };

    let mut observer = StderrObserver;
    match orchestrator.run_task(&request, &options, &mut observer) {
        Ok(outcome) => {
            record.status = SessionStatus::Succeeded;
            record.plan = Some(outcome.plan.clone());
            record.raw_plan = Some(outcome.raw_plan.clone());
            record.result = Some(outcome.result.clone());
            record.phases = outcome.phases.clone();
            record.debug = outcome.debug.clone();
            store.persist_session(&record).map_err(|err| err.to_string())?;
            Ok(render_outcome(&session_id, &outcome))
        }
        Err(task_error) => {
            record.status = SessionStatus::Failed;
            record.error = Some(task_error.message.clone());
            record.detail = task_error.cause.as_ref().map(|cause| cause.to_string());
            record.phases = task_error.phases.clone();
            record.plan = task_error.context.plan.clone();
            record.raw_plan = task_error.context.raw_plan.clone();
            record.result = task_error.context.result.clone();
            record.debug = task_error.context.debug.clone();
            record.response_text = task_error.context.response_text.clone();
            store.persist_session(&record).map_err(|err| err.to_string())?;
            Err(render_failure(&session_id, &task_error))
        }
    }
}

fn load_cli_settings() -> Result<Settings, String> {
    let path = default_settings_path().map_err(|err| err.to_string())?;
    let settings = load_settings(&path).map_err(|err| {
        format!("{err}\nRun `clipwright setup` to create a default config.")
    })?;
    validate_settings(&settings, &ToolRegistry::builtin()).map_err(|err| err.to_string())?;
    Ok(settings)
}

fn attach_cli_files(paths: &[String]) -> Result<Vec<AgentFile>, String> {
    let mut files = Vec::new();
    for raw in paths {
        let path = Path::new(raw);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|err| err.to_string())?
                .join(path)
        };
        let metadata = fs::metadata(&absolute)
            .map_err(|err| format!("cannot attach `{raw}`: {err}"))?;
        if !metadata.is_file() {
            return Err(format!("cannot attach `{raw}`: not a regular file"));
        }
        files.push(AgentFile {
            id: stable_file_id(&absolute),
            name: absolute
                .file_name()
                .map(|v| v.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.clone()),
            path: absolute.display().to_string(),
            size: metadata.len(),
            media_type: media_type_for_path(&absolute).to_string(),
        });
    }
    Ok(files)
}

fn render_outcome(session_id: &str, outcome: &TaskOutcome) -> String {
    let mut lines = Vec::new();
    lines.push(format!("session {session_id} succeeded"));
    if !outcome.plan.overview.is_empty() {
        lines.push(outcome.plan.overview.clone());
    }
    if outcome.result.dry_run {
        lines.push("dry run: no commands were executed".to_string());
    }
    for output in &outcome.result.resolved_outputs {
        let size = output
            .size
            .map(|bytes| format!("{bytes} bytes"))
            .unwrap_or_else(|| "missing".to_string());
        lines.push(format!("  {} ({size})", output.absolute_path));
    }
    if !outcome.plan.follow_up.is_empty() {
        lines.push(format!("follow-up: {}", outcome.plan.follow_up));
    }
    lines.join("\n")
}

fn render_failure(session_id: &str, task_error: &TaskError) -> String {
    let failed_phase = task_error
        .phases
        .iter()
        .rev()
        .find(|phase| phase.error.is_some())
        .map(|phase| phase.id.clone())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "session {session_id} failed during {failed_phase}: {}",
        task_error.message
    )
}

/// Streams step progress to stderr while a plan runs.
struct StderrObserver;

impl ExecutionObserver for StderrObserver {
    fn on_command_start(&mut self, index: usize, step: &CommandStepPlan) {
        eprintln!("[step {}] {} {}", index + 1, step.command, step.arguments.join(" "));
    }

    fn on_command_output(&mut self, _index: usize, _stream: OutputStream, chunk: &str) {
        let _ = std::io::stderr().write_all(chunk.as_bytes());
    }

    fn on_command_skip(&mut self, index: usize, step: &CommandStepPlan, reason: SkipReason) {
        eprintln!(
            "[step {}] {} skipped ({})",
            index + 1,
            step.command,
            reason.as_str()
        );
    }

    fn on_command_end(&mut self, index: usize, result: &CommandStepResult) {
        match result.exit_code {
            Some(code) => eprintln!("[step {}] exited with code {code}", index + 1),
            None if result.timed_out => eprintln!("[step {}] timed out", index + 1),
            None => eprintln!("[step {}] terminated without exit code", index + 1),
        }
    }
}
