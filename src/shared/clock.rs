/// Unix timestamp in milliseconds, the resolution used by phases, logs, and
/// session records.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
