use clipwright::app::cli::{cli_help_lines, parse_cli_verb, parse_run_args, CliVerb};

#[test]
fn cli_module_maps_verbs() {
    assert_eq!(parse_cli_verb("run"), CliVerb::Run);
    assert_eq!(parse_cli_verb("revise"), CliVerb::Revise);
    assert_eq!(parse_cli_verb("tools"), CliVerb::Tools);
    assert_eq!(parse_cli_verb("show"), CliVerb::Show);
    assert_eq!(parse_cli_verb("setup"), CliVerb::Setup);
    assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
    assert_eq!(parse_cli_verb("dance"), CliVerb::Unknown);
}

#[test]
fn cli_module_help_mentions_every_verb() {
    let help = cli_help_lines().join("\n");
    for verb in ["setup", "run", "revise", "tools", "show"] {
        assert!(help.contains(verb), "help missing `{verb}`");
    }
}

#[test]
fn cli_module_parses_run_flags_and_task_words() {
    let args: Vec<String> = [
        "--output-dir",
        "/tmp/out",
        "--file",
        "a.mp4",
        "--file",
        "b.png",
        "--dry-run",
        "make",
        "a",
        "gif",
    ]
    .iter()
    .map(|v| v.to_string())
    .collect();

    let parsed = parse_run_args(&args).expect("parse");
    assert_eq!(parsed.task, "make a gif");
    assert_eq!(parsed.output_dir, "/tmp/out");
    assert_eq!(parsed.files, vec!["a.mp4", "b.png"]);
    assert!(parsed.dry_run);
    assert!(!parsed.debug);
}

#[test]
fn cli_module_rejects_incomplete_run_invocations() {
    let missing_task: Vec<String> =
        ["--output-dir", "/tmp/out"].iter().map(|v| v.to_string()).collect();
    assert!(parse_run_args(&missing_task).is_err());

    let missing_dir: Vec<String> = ["make", "a", "gif"].iter().map(|v| v.to_string()).collect();
    assert!(parse_run_args(&missing_dir).is_err());

    let unknown_flag: Vec<String> = ["--output-dir", "/tmp/out", "--frobnicate", "task"]
        .iter()
        .map(|v| v.to_string())
        .collect();
    let err = parse_run_args(&unknown_flag).unwrap_err();
    assert!(err.contains("--frobnicate"));
}

#[test]
fn cli_module_dangling_value_flag_errors() {
    let args: Vec<String> = ["task", "--file"].iter().map(|v| v.to_string()).collect();
    assert!(parse_run_args(&args).is_err());
}
