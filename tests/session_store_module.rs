use clipwright::session::{
    SessionError, SessionRecord, SessionStatus, SessionStore, ANCESTRY_DEPTH_LIMIT,
};
use clipwright::shared::clock::now_millis;
use tempfile::tempdir;

#[test]
fn session_store_module_round_trips_records() {
    let dir = tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());

    let mut record = SessionRecord::new("task-abc", "scale the image", now_millis());
    record.status = SessionStatus::Succeeded;
    record.parent_session_id = Some("task-parent".to_string());
    store.persist_session(&record).expect("persist");

    let loaded = store.load_session("task-abc").expect("load");
    assert_eq!(loaded, record);
    assert!(store.session_exists("task-abc"));
}

#[test]
fn session_store_module_unknown_session_is_distinct_error() {
    let dir = tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());

    let err = store.load_session("task-nope").unwrap_err();
    assert!(matches!(
        err,
        SessionError::UnknownSession { ref session_id } if session_id == "task-nope"
    ));
}

#[test]
fn session_store_module_allocates_prefixed_ids() {
    let dir = tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());

    let id = store.allocate_session_id(now_millis()).expect("allocate");
    assert!(id.starts_with("task-"));
    let suffix = id.rsplit('-').next().expect("suffix");
    assert_eq!(suffix.len(), 4);
}

#[test]
fn session_store_module_ancestry_walks_oldest_first() {
    let dir = tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());

    let root = SessionRecord::new("task-root", "root", now_millis());
    store.persist_session(&root).expect("persist root");
    let mut mid = SessionRecord::new("task-mid", "mid", now_millis());
    mid.parent_session_id = Some("task-root".to_string());
    store.persist_session(&mid).expect("persist mid");
    let mut leaf = SessionRecord::new("task-leaf", "leaf", now_millis());
    leaf.parent_session_id = Some("task-mid".to_string());

    let chain = store.collect_ancestry(&leaf);
    let ids: Vec<&str> = chain.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["task-root", "task-mid", "task-leaf"]);
}

#[test]
fn session_store_module_ancestry_truncates_on_missing_parent() {
    let dir = tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());

    let mut orphan = SessionRecord::new("task-orphan", "orphan", now_millis());
    orphan.parent_session_id = Some("task-vanished".to_string());

    let chain = store.collect_ancestry(&orphan);
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].id, "task-orphan");
}

#[test]
fn session_store_module_ancestry_is_depth_capped() {
    let dir = tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());

    // A chain far deeper than the cap.
    for index in 0..40 {
        let mut record = SessionRecord::new(format!("task-{index}"), "chained", now_millis());
        if index > 0 {
            record.parent_session_id = Some(format!("task-{}", index - 1));
        }
        store.persist_session(&record).expect("persist");
    }
    let leaf = store.load_session("task-39").expect("load leaf");

    let chain = store.collect_ancestry(&leaf);
    assert_eq!(chain.len(), ANCESTRY_DEPTH_LIMIT);
    assert_eq!(chain.last().expect("leaf").id, "task-39");
}
