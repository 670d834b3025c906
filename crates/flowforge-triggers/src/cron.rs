//! Cron entries: parse a cron expression once at registration time and
//! compute each entry's next fire time from `cron::Schedule`.

use crate::TriggerError;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

/// A parsed cron expression, kept alongside the raw string for display.
pub struct CronSchedule {
    pub expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, TriggerError> {
        let schedule = Schedule::from_str(expression)
            .map_err(|e| TriggerError::InvalidCronExpression { expression: expression.to_string(), message: e.to_string() })?;
        Ok(Self { expression: expression.to_string(), schedule })
    }

    /// The next fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    pub fn is_due(&self, now: DateTime<Utc>, next_run: DateTime<Utc>) -> bool {
        now >= next_run
    }
}
