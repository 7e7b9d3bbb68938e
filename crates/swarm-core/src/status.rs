use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

pub const STEP_EXECUTING: &str = "Executing command";
pub const STEP_ERROR: &str = "Error";
pub const STEP_FINISHING: &str = "Finishing";
pub const TASK_CLOSING: &str = "closing";
pub const RESULT_FAILED: &str = "Failed";

/// Lifecycle of one command: `Pending -> Running -> {Success | Error}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusResult {
    Pending,
    Running,
    Success,
    Error,
}

impl StatusResult {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusResult::Success | StatusResult::Error)
    }
}

impl fmt::Display for StatusResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusResult::Pending => write!(f, "Pending"),
            StatusResult::Running => write!(f, "Running"),
            StatusResult::Success => write!(f, "Success"),
            StatusResult::Error => write!(f, "Error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub current_step: String,
    pub result: StatusResult,
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        Self {
            current_step: "Initialized".to_string(),
            result: StatusResult::Pending,
        }
    }
}

/// A runner's status, mutated only under its lock so a concurrent reader
/// never observes a half-written update.
#[derive(Debug, Default)]
pub struct StatusCell {
    inner: Mutex<ExecutionStatus>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) {
        let mut status = self.inner.lock();
        status.current_step = STEP_EXECUTING.to_string();
        status.result = StatusResult::Running;
    }

    pub fn succeed(&self) {
        self.inner.lock().result = StatusResult::Success;
    }

    pub fn fail(&self) {
        self.inner.lock().result = StatusResult::Error;
    }

    pub fn snapshot(&self) -> ExecutionStatus {
        self.inner.lock().clone()
    }
}

/// Destination for live progress. Called from many target tasks at once.
pub trait StatusSink: Send + Sync {
    fn update(&self, target: &str, task: &str, step: &str, result: &str);
}

/// What a [`StatusBoard`] knows about one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetStatus {
    pub current_task: String,
    pub current_step: String,
    pub result: String,
    pub updated_at: DateTime<Utc>,
}

impl TargetStatus {
    fn pending() -> Self {
        Self {
            current_task: "Starting...".to_string(),
            current_step: "Initializing...".to_string(),
            result: StatusResult::Pending.to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// In-memory sink: the latest status line per target behind a single mutex.
#[derive(Debug, Default)]
pub struct StatusBoard {
    targets: Mutex<BTreeMap<String, TargetStatus>>,
}

impl StatusBoard {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets = targets
            .into_iter()
            .map(|t| (t.into(), TargetStatus::pending()))
            .collect();
        Self {
            targets: Mutex::new(targets),
        }
    }

    pub fn get(&self, target: &str) -> Option<TargetStatus> {
        self.targets.lock().get(target).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, TargetStatus> {
        self.targets.lock().clone()
    }

    /// Every known target has reached its closing marker.
    pub fn all_finished(&self) -> bool {
        self.targets
            .lock()
            .values()
            .all(|s| s.current_task == TASK_CLOSING && s.current_step == STEP_FINISHING)
    }
}

impl StatusSink for StatusBoard {
    fn update(&self, target: &str, task: &str, step: &str, result: &str) {
        let mut targets = self.targets.lock();
        let entry = targets
            .entry(target.to_string())
            .or_insert_with(TargetStatus::pending);
        entry.current_task = task.to_string();
        entry.current_step = step.to_string();
        if !result.is_empty() {
            entry.result = result.to_string();
        }
        entry.updated_at = Utc::now();
    }
}

/// Sink that turns each update into a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn update(&self, target: &str, task: &str, step: &str, result: &str) {
        info!(target_name = target, task, step, result, "status update");
    }
}

/// Fan an update out to several sinks.
pub struct SinkSet {
    sinks: Vec<std::sync::Arc<dyn StatusSink>>,
}

impl SinkSet {
    pub fn new(sinks: Vec<std::sync::Arc<dyn StatusSink>>) -> Self {
        Self { sinks }
    }
}

impl StatusSink for SinkSet {
    fn update(&self, target: &str, task: &str, step: &str, result: &str) {
        for sink in &self.sinks {
            sink.update(target, task, step, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_walks_through_lifecycle() {
        let cell = StatusCell::new();
        assert_eq!(cell.snapshot().result, StatusResult::Pending);

        cell.begin();
        let running = cell.snapshot();
        assert_eq!(running.current_step, STEP_EXECUTING);
        assert_eq!(running.result, StatusResult::Running);

        cell.fail();
        assert!(cell.snapshot().result.is_terminal());
    }

    #[test]
    fn board_tracks_latest_update_per_target() {
        let board = StatusBoard::new(["manager-1", "worker-1"]);
        board.update("manager-1", "install docker", STEP_EXECUTING, "Running");
        board.update("manager-1", "install docker", STEP_EXECUTING, "Success");

        let status = board.get("manager-1").unwrap();
        assert_eq!(status.current_task, "install docker");
        assert_eq!(status.result, "Success");
        assert_eq!(board.get("worker-1").unwrap().result, "Pending");
        assert!(!board.all_finished());
    }

    #[test]
    fn board_accepts_concurrent_writers() {
        let board = std::sync::Arc::new(StatusBoard::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let board = board.clone();
                std::thread::spawn(move || {
                    for step in 0..100 {
                        board.update(&format!("vm-{i}"), "task", &step.to_string(), "Running");
                    }
                    board.update(&format!("vm-{i}"), TASK_CLOSING, STEP_FINISHING, "Success");
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(board.snapshot().len(), 8);
        assert!(board.all_finished());
    }
}
