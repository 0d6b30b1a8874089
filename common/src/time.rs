//! The single place that reads the wall clock, so tests can avoid it.

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
