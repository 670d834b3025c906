//! Idle entries: fire when no run has completed in the configured window
//! and no run of that workflow is currently active.

use chrono::{DateTime, Duration, Utc};

/// Whether an idle entry should fire, given when its workflow last
/// completed a run (`None` if it has never run) and whether a run of
/// that workflow is active right now.
pub fn is_due(idle_minutes: i64, last_completed: Option<DateTime<Utc>>, now: DateTime<Utc>, active: bool) -> bool {
    if active {
        return false;
    }
    match last_completed {
        None => true,
        Some(last) => now - last >= Duration::minutes(idle_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn never_run_is_immediately_due() {
        assert!(is_due(5, None, Utc::now(), false));
    }

    #[test]
    fn active_run_suppresses_firing() {
        let last = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let now = last + Duration::hours(1);
        assert!(!is_due(5, Some(last), now, true));
    }

    #[test]
    fn fires_once_idle_window_elapses() {
        let last = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(!is_due(10, Some(last), last + Duration::minutes(9), false));
        assert!(is_due(10, Some(last), last + Duration::minutes(10), false));
    }
}
