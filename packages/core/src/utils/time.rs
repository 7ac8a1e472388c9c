// Время

use chrono::Utc;

/// Текущее время, unix секунды
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Текущее время в RFC 3339
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
