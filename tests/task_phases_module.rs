use clipwright::task::phases::{PhaseFailure, PhaseStatus, PhaseTracker};
use serde_json::{json, Map};

fn tracker() -> PhaseTracker {
    PhaseTracker::new(&[
        ("plan", "Plan commands"),
        ("execute", "Execute commands"),
        ("summarize", "Summarize results"),
    ])
}

#[test]
fn phases_module_starts_pending_without_timestamps() {
    let tracker = tracker();
    assert_eq!(tracker.phases().len(), 3);
    for phase in tracker.phases() {
        assert_eq!(phase.status, PhaseStatus::Pending);
        assert_eq!(phase.started_at, None);
        assert_eq!(phase.finished_at, None);
        assert!(phase.error.is_none());
    }
}

#[test]
fn phases_module_tracks_success_with_meta_and_logs() {
    let mut tracker = tracker();
    tracker.start("plan");
    tracker.log("plan", "asked the planner");
    let mut meta = Map::new();
    meta.insert("steps".to_string(), json!(2));
    tracker.succeed("plan", meta);

    let phase = &tracker.phases()[0];
    assert_eq!(phase.status, PhaseStatus::Success);
    assert!(phase.started_at.is_some());
    assert!(phase.finished_at.is_some());
    assert!(phase.finished_at >= phase.started_at);
    assert_eq!(phase.meta.get("steps"), Some(&json!(2)));
    assert_eq!(phase.logs.len(), 1);
    assert_eq!(phase.logs[0].message, "asked the planner");
}

#[test]
fn phases_module_records_failure_details() {
    let mut tracker = tracker();
    tracker.start("plan");
    tracker.fail(
        "plan",
        PhaseFailure {
            message: "model refused".to_string(),
            name: "PlannerError".to_string(),
            detail: None,
        },
        Map::new(),
    );

    let phase = &tracker.phases()[0];
    assert_eq!(phase.status, PhaseStatus::Failed);
    assert_eq!(
        phase.error.as_ref().map(|e| e.message.as_str()),
        Some("model refused")
    );
}

#[test]
fn phases_module_transitions_are_monotonic() {
    let mut tracker = tracker();
    tracker.start("plan");
    tracker.succeed("plan", Map::new());
    let finished_at = tracker.phases()[0].finished_at;

    // A terminal phase stays terminal: restarts and re-completions are
    // ignored.
    tracker.start("plan");
    tracker.fail(
        "plan",
        PhaseFailure {
            message: "late failure".to_string(),
            name: "Late".to_string(),
            detail: None,
        },
        Map::new(),
    );
    assert_eq!(tracker.phases()[0].status, PhaseStatus::Success);
    assert_eq!(tracker.phases()[0].finished_at, finished_at);
    assert!(tracker.phases()[0].error.is_none());

    // Completing a phase that never started is ignored too.
    tracker.succeed("execute", Map::new());
    assert_eq!(tracker.phases()[1].status, PhaseStatus::Pending);
}

#[test]
fn phases_module_history_through_stops_at_named_phase() {
    let mut tracker = tracker();
    tracker.start("plan");
    tracker.fail(
        "plan",
        PhaseFailure {
            message: "boom".to_string(),
            name: "PlannerError".to_string(),
            detail: None,
        },
        Map::new(),
    );

    let history = tracker.history_through("plan");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, "plan");
    assert_eq!(history[0].status, PhaseStatus::Failed);

    let longer = tracker.history_through("execute");
    assert_eq!(longer.len(), 2);
}

#[test]
fn phases_module_serializes_camel_case_contract() {
    let mut tracker = tracker();
    tracker.start("plan");
    tracker.succeed("plan", Map::new());

    let value = serde_json::to_value(tracker.phases()).expect("serialize");
    let phase = &value[0];
    assert!(phase.get("startedAt").is_some());
    assert!(phase.get("finishedAt").is_some());
    assert_eq!(phase["status"], json!("success"));
    assert_eq!(value[1]["status"], json!("pending"));
}
