//! Process start time, used to compute uptime for the health endpoint.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

static STARTUP_TIME: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(now_secs()));

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Records the current time as the process start time. Safe to call more
/// than once; only the first call (the one at server startup) matters.
pub fn init_startup_time() {
    let now = now_secs();
    STARTUP_TIME.store(now, Ordering::SeqCst);
    info!(started_at = now, "startup time recorded");
}

/// Seconds elapsed since [`init_startup_time`] was called.
pub fn get_uptime_seconds() -> u64 {
    now_secs().saturating_sub(STARTUP_TIME.load(Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_is_zero_right_after_init() {
        init_startup_time();
        assert_eq!(get_uptime_seconds(), 0);
    }

    #[test]
    fn uptime_never_goes_negative() {
        init_startup_time();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(get_uptime_seconds() < 5);
    }
}
