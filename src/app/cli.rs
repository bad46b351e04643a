#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Setup,
    Run,
    Revise,
    Tools,
    Show,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "setup" => CliVerb::Setup,
        "run" => CliVerb::Run,
        "revise" => CliVerb::Revise,
        "tools" => CliVerb::Tools,
        "show" => CliVerb::Show,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  setup                                Write a default config and state directory".to_string(),
        "  run --output-dir <dir> [options] <task>".to_string(),
        "                                       Plan and execute a media task".to_string(),
        "    --file <path>                      Attach an input file (repeatable)".to_string(),
        "    --dry-run                          Preview the plan without executing".to_string(),
        "    --debug                            Include planner debug info".to_string(),
        "    --raw-response                     Keep the raw planner response".to_string(),
        "  revise <session-id> <complaint>      Re-attempt a session with a complaint".to_string(),
        "  tools                                List available commands".to_string(),
        "  show <session-id>                    Print a stored session record".to_string(),
        "  help                                 Show this help".to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}

/// Parsed arguments for `run`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    pub task: String,
    pub output_dir: String,
    pub files: Vec<String>,
    pub dry_run: bool,
    pub debug: bool,
    pub raw_response: bool,
}

pub fn parse_run_args(args: &[String]) -> Result<RunArgs, String> {
    let mut parsed = RunArgs::default();
    let mut task_words: Vec<String> = Vec::new();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--output-dir" => {
                index += 1;
                parsed.output_dir = args
                    .get(index)
                    .cloned()
                    .ok_or("--output-dir requires a value")?;
            }
            "--file" => {
                index += 1;
                let value = args.get(index).cloned().ok_or("--file requires a value")?;
                parsed.files.push(value);
            }
            "--dry-run" => parsed.dry_run = true,
            "--debug" => parsed.debug = true,
            "--raw-response" => parsed.raw_response = true,
            flag if flag.starts_with("--") => {
                return Err(format!("unknown flag `{flag}` for run"));
            }
            word => task_words.push(word.to_string()),
        }
        index += 1;
    }
    parsed.task = task_words.join(" ");
    if parsed.task.trim().is_empty() {
        return Err("run requires a task description".to_string());
    }
    if parsed.output_dir.trim().is_empty() {
        return Err("run requires --output-dir".to_string());
    }
    Ok(parsed)
}
