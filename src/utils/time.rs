//! Time and timestamp utilities

use std::time::Duration;

/// Get current Unix timestamp in milliseconds
pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Round a remaining wait up to whole seconds, never below one.
///
/// Used for `Retry-After`, where telling a client "0" would invite an
/// immediate retry that is still inside the window.
pub fn ceil_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    let secs = if remaining.subsec_nanos() > 0 { secs + 1 } else { secs };
    secs.max(1)
}
