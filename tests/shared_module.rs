use clipwright::shared::fs_atomic::atomic_write_file;
use clipwright::shared::ids::{generate_session_id, stable_file_id};
use clipwright::shared::logging::{append_task_log_line, task_log_path};
use clipwright::shared::mime::media_type_for_path;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn shared_module_session_ids_are_prefixed_and_vary() {
    let first = generate_session_id(1_700_000_000_000).expect("id");
    let second = generate_session_id(1_700_000_000_000).expect("id");
    assert!(first.starts_with("task-"));
    assert_eq!(first.rsplit('-').next().map(str::len), Some(4));
    // Same timestamp, random suffix: equal ids are possible but the shape
    // must match either way.
    assert!(second.starts_with("task-"));
}

#[test]
fn shared_module_session_id_rejects_negative_timestamp() {
    assert!(generate_session_id(-1).is_err());
}

#[test]
fn shared_module_file_ids_are_stable_per_path() {
    let a = stable_file_id(Path::new("/tmp/a.mp4"));
    let b = stable_file_id(Path::new("/tmp/a.mp4"));
    let c = stable_file_id(Path::new("/tmp/b.mp4"));
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.starts_with("file-"));
}

#[test]
fn shared_module_media_types_cover_common_extensions() {
    assert_eq!(media_type_for_path(Path::new("clip.mp4")), "video/mp4");
    assert_eq!(media_type_for_path(Path::new("frame.PNG")), "image/png");
    assert_eq!(media_type_for_path(Path::new("audio.flac")), "audio/flac");
    assert_eq!(
        media_type_for_path(Path::new("mystery.bin")),
        "application/octet-stream"
    );
    assert_eq!(
        media_type_for_path(Path::new("no_extension")),
        "application/octet-stream"
    );
}

#[test]
fn shared_module_atomic_write_creates_parents_and_replaces() {
    let dir = tempdir().expect("tempdir");
    let target = dir.path().join("deep/nested/state.json");

    atomic_write_file(&target, b"first").expect("first write");
    atomic_write_file(&target, b"second").expect("second write");
    assert_eq!(fs::read_to_string(&target).expect("read"), "second");
}

#[test]
fn shared_module_task_log_appends_lines() {
    let dir = tempdir().expect("tempdir");
    append_task_log_line(dir.path(), "ts=1 session=task-a phase=plan status=in_progress")
        .expect("append");
    append_task_log_line(dir.path(), "ts=2 session=task-a phase=plan status=success")
        .expect("append");

    let content = fs::read_to_string(task_log_path(dir.path())).expect("read log");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("status=in_progress"));
    assert!(lines[1].contains("status=success"));
}
