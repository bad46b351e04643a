use clipwright::plan::{validate_plan, PlanError};
use clipwright::tools::ToolRegistry;
use serde_json::json;
use std::path::Path;

fn registry() -> ToolRegistry {
    ToolRegistry::builtin()
}

#[test]
fn validate_module_accepts_structured_plan() {
    let raw = json!({
        "overview": "convert the clip",
        "followUp": "consider a gif version",
        "steps": [{
            "command": "ffmpeg",
            "arguments": ["-i", "in.mp4", "out.webm"],
            "reasoning": "webm requested",
            "outputs": [{"path": "out.webm", "description": "converted clip"}],
            "title": "  Convert  ",
        }],
    });

    let plan = validate_plan(&registry(), &raw, Path::new("/tmp/out")).expect("valid plan");
    assert_eq!(plan.overview, "convert the clip");
    assert_eq!(plan.follow_up, "consider a gif version");
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].command, "ffmpeg");
    assert_eq!(plan.steps[0].arguments, vec!["-i", "in.mp4", "out.webm"]);
    assert_eq!(plan.steps[0].outputs[0].path, "/tmp/out/out.webm");
    assert_eq!(plan.steps[0].title.as_deref(), Some("Convert"));
    assert_eq!(plan.steps[0].id, None);
}

#[test]
fn validate_module_is_idempotent() {
    let raw = json!({
        "overview": 42,
        "steps": [{
            "command": "ffmpeg",
            "arguments": ["-i", "a.mp4"],
            "outputs": [{"path": "sub/../b.mp4", "description": "clip"}],
            "note": "   ",
        }],
    });

    let first = validate_plan(&registry(), &raw, Path::new("/tmp/out")).expect("first pass");
    let reserialized = serde_json::to_value(&first).expect("serialize");
    let second = validate_plan(&registry(), &reserialized, Path::new("/tmp/out"))
        .expect("second pass");
    assert_eq!(first, second);
    assert_eq!(first.steps[0].outputs[0].path, "/tmp/out/b.mp4");
    assert_eq!(first.overview, "");
    assert_eq!(first.steps[0].note, None);
}

#[test]
fn validate_module_rejects_escaping_output_path() {
    let raw = json!({
        "steps": [{
            "command": "ffmpeg",
            "arguments": [],
            "outputs": [{"path": "../../etc/passwd", "description": "nope"}],
        }],
    });

    let err = validate_plan(&registry(), &raw, Path::new("/tmp/out")).unwrap_err();
    assert!(matches!(err, PlanError::OutputPathEscape { index: 0, .. }));
}

#[test]
fn validate_module_rejects_absolute_path_outside_output_dir() {
    let raw = json!({
        "steps": [{
            "command": "ffmpeg",
            "arguments": [],
            "outputs": [{"path": "/etc/passwd", "description": "nope"}],
        }],
    });

    let err = validate_plan(&registry(), &raw, Path::new("/tmp/out")).unwrap_err();
    assert!(matches!(err, PlanError::OutputPathEscape { .. }));
}

#[test]
fn validate_module_accepts_absolute_path_inside_output_dir() {
    let raw = json!({
        "steps": [{
            "command": "ffmpeg",
            "arguments": [],
            "outputs": [{"path": "/tmp/out/sub/file.png", "description": "frame"}],
        }],
    });

    let plan = validate_plan(&registry(), &raw, Path::new("/tmp/out")).expect("valid plan");
    assert_eq!(plan.steps[0].outputs[0].path, "/tmp/out/sub/file.png");
}

#[test]
fn validate_module_rejects_non_string_argument() {
    let raw = json!({
        "steps": [{
            "command": "ffmpeg",
            "arguments": [123],
            "outputs": [],
        }],
    });

    let err = validate_plan(&registry(), &raw, Path::new("/tmp/out")).unwrap_err();
    assert!(err.to_string().contains("array of strings"));
}

#[test]
fn validate_module_rejects_unknown_command() {
    let raw = json!({
        "steps": [{"command": "rm", "arguments": ["-rf", "/"], "outputs": []}],
    });

    let err = validate_plan(&registry(), &raw, Path::new("/tmp/out")).unwrap_err();
    assert!(matches!(
        err,
        PlanError::UnknownCommand { index: 0, ref command } if command == "rm"
    ));
}

#[test]
fn validate_module_accepts_no_op_command_with_output_validation() {
    let raw = json!({
        "steps": [{
            "command": "none",
            "arguments": [],
            "outputs": [{"path": "../escape.txt", "description": "nope"}],
        }],
    });

    // The sentinel is a known command, but its outputs still face the
    // escape guard.
    let err = validate_plan(&registry(), &raw, Path::new("/tmp/out")).unwrap_err();
    assert!(matches!(err, PlanError::OutputPathEscape { .. }));

    let ok = json!({
        "steps": [{"command": "none", "arguments": [], "outputs": []}],
    });
    let plan = validate_plan(&registry(), &ok, Path::new("/tmp/out")).expect("no-op plan");
    assert_eq!(plan.steps[0].command, "none");
}

#[test]
fn validate_module_distinct_structural_errors() {
    let registry = registry();

    let err = validate_plan(&registry, &json!("not an object"), Path::new("/tmp/out"));
    assert!(matches!(err.unwrap_err(), PlanError::NotAnObject));

    let err = validate_plan(&registry, &json!({"steps": []}), Path::new("/tmp/out"));
    assert!(matches!(err.unwrap_err(), PlanError::EmptySteps));

    let err = validate_plan(&registry, &json!({"overview": "x"}), Path::new("/tmp/out"));
    assert!(matches!(err.unwrap_err(), PlanError::MissingSteps));

    let err = validate_plan(
        &registry,
        &json!({"steps": [{"command": "ffmpeg", "arguments": []}]}),
        Path::new(""),
    );
    assert!(matches!(err.unwrap_err(), PlanError::EmptyOutputDir));

    let err = validate_plan(&registry, &json!({"steps": ["oops"]}), Path::new("/tmp/out"));
    assert!(matches!(
        err.unwrap_err(),
        PlanError::StepNotAnObject { index: 0 }
    ));

    let err = validate_plan(
        &registry,
        &json!({"steps": [{"command": "ffmpeg", "arguments": [], "outputs": [{"path": "  ", "description": "d"}]}]}),
        Path::new("/tmp/out"),
    );
    assert!(matches!(
        err.unwrap_err(),
        PlanError::EmptyOutputPath { index: 0 }
    ));
}

#[test]
fn validate_module_preserves_argument_order() {
    let raw = json!({
        "steps": [{
            "command": "ffmpeg",
            "arguments": ["-ss", "3", "-i", "in.mp4", "-t", "2", "cut.mp4"],
            "outputs": [],
        }],
    });

    let plan = validate_plan(&registry(), &raw, Path::new("/tmp/out")).expect("valid plan");
    assert_eq!(
        plan.steps[0].arguments,
        vec!["-ss", "3", "-i", "in.mp4", "-t", "2", "cut.mp4"]
    );
}
