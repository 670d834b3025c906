//! # flowforge-triggers
//!
//! The long-lived component that evaluates cron expressions and idle
//! predicates against a workflow's `trigger` nodes and invokes the
//! Scheduler through the same entry point a manual run uses, tagging the
//! `source` for history.
//!
//! A `tokio::spawn` loop + `sleep` ticker, the same shape as any
//! background maintenance task, retasked here for cron/idle evaluation.

mod cron;
mod idle;
mod scheduler;

pub use cron::CronSchedule;
pub use scheduler::{
    entries_from_schema, TriggerEntry, TriggerFire, TriggerFireKind, TriggerHandler, TriggerKind, TriggerScheduler,
    TriggerStatus,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("invalid cron expression {expression:?}: {message}")]
    InvalidCronExpression { expression: String, message: String },
}
