//! `TriggerScheduler`: a single ticker evaluating every registered
//! cron/idle entry, refusing to fire a workflow that already has a run
//! in flight.

use crate::cron::CronSchedule;
use crate::idle;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowforge_core::schema::WorkflowSchema;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

pub enum TriggerKind {
    Cron(CronSchedule),
    Idle { minutes: i64 },
}

/// One registered trigger node, plus the scheduling state the ticker
/// mutates each pass.
pub struct TriggerEntry {
    pub id: String,
    pub workspace: String,
    pub workflow_path: String,
    pub node_id: String,
    pub kind: TriggerKind,
    next_run: Option<DateTime<Utc>>,
    last_completed: Option<DateTime<Utc>>,
}

impl TriggerEntry {
    pub fn new(id: String, workspace: String, workflow_path: String, node_id: String, kind: TriggerKind) -> Self {
        Self { id, workspace, workflow_path, node_id, kind, next_run: None, last_completed: None }
    }

    fn workflow_key(&self) -> String {
        format!("{}:{}", self.workspace, self.workflow_path)
    }

    fn is_due(&mut self, now: DateTime<Utc>, active: bool) -> bool {
        match &self.kind {
            TriggerKind::Cron(schedule) => {
                let next_run = *self.next_run.get_or_insert_with(|| schedule.next_after(now).unwrap_or(now));
                !active && schedule.is_due(now, next_run)
            }
            TriggerKind::Idle { minutes } => idle::is_due(*minutes, self.last_completed, now, active),
        }
    }

    fn advance_after_fire(&mut self, now: DateTime<Utc>) {
        if let TriggerKind::Cron(schedule) = &self.kind {
            self.next_run = schedule.next_after(now);
        }
        self.last_completed = Some(now);
    }

    /// A serializable snapshot for a status/introspection endpoint.
    pub fn status(&self) -> TriggerStatus {
        TriggerStatus {
            id: self.id.clone(),
            workflow_path: self.workflow_path.clone(),
            node_id: self.node_id.clone(),
            kind: match &self.kind {
                TriggerKind::Cron(schedule) => format!("cron({})", schedule.expression),
                TriggerKind::Idle { minutes } => format!("idle({minutes}m)"),
            },
            next_run: self.next_run,
            last_completed: self.last_completed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerStatus {
    pub id: String,
    pub workflow_path: String,
    pub node_id: String,
    pub kind: String,
    pub next_run: Option<DateTime<Utc>>,
    pub last_completed: Option<DateTime<Utc>>,
}

/// Scan a workflow's `trigger` nodes and build one entry per `cron`/`idle`
/// node (`trigger_kind == "manual"` or unset carries no scheduling entry
/// — it only ever runs when invoked directly).
pub fn entries_from_schema(
    workspace: &str,
    workflow_path: &str,
    schema: &WorkflowSchema,
) -> Result<Vec<TriggerEntry>, crate::TriggerError> {
    let mut entries = Vec::new();
    for node in &schema.nodes {
        if node.node_kind != "trigger" {
            continue;
        }
        let entry = match node.data.trigger_kind.as_deref() {
            Some("cron") => {
                let expression = node.data.cron_expression.clone().unwrap_or_default();
                let schedule = CronSchedule::parse(&expression)?;
                Some(TriggerKind::Cron(schedule))
            }
            Some("idle") => Some(TriggerKind::Idle { minutes: node.data.idle_minutes.unwrap_or(30) }),
            _ => None,
        };
        if let Some(kind) = entry {
            entries.push(TriggerEntry::new(
                format!("{workflow_path}#{}", node.id),
                workspace.to_string(),
                workflow_path.to_string(),
                node.id.clone(),
                kind,
            ));
        }
    }
    Ok(entries)
}

/// Which kind of entry fired, so a [`TriggerHandler`] can tag the run it
/// starts without having to look the entry back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerFireKind {
    Cron,
    Idle,
}

/// What fired, handed to the [`TriggerHandler`].
#[derive(Debug, Clone)]
pub struct TriggerFire {
    pub entry_id: String,
    pub workspace: String,
    pub workflow_path: String,
    pub node_id: String,
    pub kind: TriggerFireKind,
}

/// Invokes a run on behalf of a fired trigger. Implemented by the binary
/// that owns a `Scheduler` + `HistoryStore` (the API server or the CLI's
/// `serve` command) — this crate only decides *when* to fire.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    async fn invoke(&self, fire: TriggerFire);
}

pub struct TriggerScheduler<H: TriggerHandler> {
    entries: Mutex<Vec<TriggerEntry>>,
    active: Mutex<HashSet<String>>,
    handler: H,
    tick_interval: Duration,
}

impl<H: TriggerHandler + 'static> TriggerScheduler<H> {
    pub fn new(entries: Vec<TriggerEntry>, handler: H, tick_interval: Duration) -> Self {
        Self { entries: Mutex::new(entries), active: Mutex::new(HashSet::new()), handler, tick_interval }
    }

    /// Start the ticker as a background task.
    pub fn start(self: std::sync::Arc<Self>) {
        tokio::spawn(async move {
            loop {
                self.tick_once(Utc::now()).await;
                tokio::time::sleep(self.tick_interval).await;
            }
        });
    }

    pub fn statuses(&self) -> Vec<TriggerStatus> {
        self.entries.lock().unwrap().iter().map(TriggerEntry::status).collect()
    }

    /// Evaluate every entry once against `now`. Exposed separately from
    /// [`Self::start`] so tests can drive the ticker deterministically.
    pub async fn tick_once(&self, now: DateTime<Utc>) {
        let due: Vec<(usize, String, TriggerFire)> = {
            let mut entries = self.entries.lock().unwrap();
            let active = self.active.lock().unwrap();
            entries
                .iter_mut()
                .enumerate()
                .filter_map(|(i, entry)| {
                    let key = entry.workflow_key();
                    let is_active = active.contains(&key);
                    if entry.is_due(now, is_active) {
                        Some((
                            i,
                            key,
                            TriggerFire {
                                entry_id: entry.id.clone(),
                                workspace: entry.workspace.clone(),
                                workflow_path: entry.workflow_path.clone(),
                                node_id: entry.node_id.clone(),
                                kind: match &entry.kind {
                                    TriggerKind::Cron(_) => TriggerFireKind::Cron,
                                    TriggerKind::Idle { .. } => TriggerFireKind::Idle,
                                },
                            },
                        ))
                    } else {
                        None
                    }
                })
                .collect()
        };

        for (index, key, fire) in due {
            {
                let mut active = self.active.lock().unwrap();
                if !active.insert(key.clone()) {
                    // Another entry for the same workflow already claimed
                    // this tick; leave next_run untouched so it retries.
                    continue;
                }
            }
            warn!(entry_id = %fire.entry_id, "trigger fired");
            self.handler.invoke(fire).await;
            self.active.lock().unwrap().remove(&key);
            self.entries.lock().unwrap()[index].advance_after_fire(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TriggerHandler for CountingHandler {
        async fn invoke(&self, _fire: TriggerFire) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn idle_entry_fires_when_never_run() {
        let entries = vec![TriggerEntry::new(
            "wf#t1".into(),
            "ws".into(),
            "wf.yaml".into(),
            "t1".into(),
            TriggerKind::Idle { minutes: 5 },
        )];
        let count = Arc::new(AtomicUsize::new(0));
        let scheduler = TriggerScheduler::new(entries, CountingHandler { count: count.clone() }, Duration::from_secs(10));
        scheduler.tick_once(Utc::now()).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn idle_entry_does_not_refire_immediately_after_completing() {
        let entries = vec![TriggerEntry::new(
            "wf#t1".into(),
            "ws".into(),
            "wf.yaml".into(),
            "t1".into(),
            TriggerKind::Idle { minutes: 5 },
        )];
        let count = Arc::new(AtomicUsize::new(0));
        let scheduler = TriggerScheduler::new(entries, CountingHandler { count: count.clone() }, Duration::from_secs(10));
        let now = Utc::now();
        scheduler.tick_once(now).await;
        scheduler.tick_once(now + chrono::Duration::seconds(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn entries_from_schema_skips_manual_triggers() {
        use flowforge_core::schema::{Metadata, NodeData, WorkflowNode};

        fn trigger_node(id: &str, kind: Option<&str>, cron: Option<&str>) -> WorkflowNode {
            let mut data = blank_node_data();
            data.trigger_kind = kind.map(str::to_string);
            data.cron_expression = cron.map(str::to_string);
            WorkflowNode {
                id: id.into(),
                node_kind: "trigger".into(),
                position: None,
                data,
                parent_id: None,
                extent: None,
                style: None,
            }
        }

        fn blank_node_data() -> NodeData {
            NodeData {
                node_type: "trigger".into(),
                label: None,
                inputs: vec![],
                outputs: vec![],
                continue_on_failure: false,
                script: None,
                commands: None,
                script_file: None,
                script_args: None,
                path: None,
                prompt: None,
                runner: None,
                model: None,
                prompt_files: None,
                output_schema: None,
                trigger_kind: None,
                cron_expression: None,
                idle_minutes: None,
                workflow_path: None,
                max_iterations: None,
                dock_slots: None,
                value_type: None,
                value: None,
                code: None,
                file: None,
            }
        }

        let schema = WorkflowSchema {
            version: 1,
            metadata: Metadata { name: "t".into(), description: None, root_directory: None },
            nodes: vec![
                trigger_node("manual1", None, None),
                trigger_node("cron1", Some("cron"), Some("0 * * * * *")),
            ],
            edges: vec![],
        };
        let entries = entries_from_schema("ws", "wf.yaml", &schema).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].node_id, "cron1");
    }
}
