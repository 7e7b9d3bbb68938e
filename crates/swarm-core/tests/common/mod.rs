#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use swarm_core::error::{CommandExecutionError, OrchestratorError};
use swarm_core::runner::{supervise, CommandRunner, RunnerFactory};
use swarm_core::status::{ExecutionStatus, StatusCell, StatusSink};
use swarm_core::{RunnerKind, TargetInstance, TargetRole};

/// (target, command) in the order runners were invoked.
pub type CallLog = Arc<Mutex<Vec<(String, String)>>>;

/// Runner driven by the command text:
/// `fail ...` exits 1, `panic ...` panics, `sleep <ms>` waits, anything else
/// echoes itself.
pub struct FakeRunner {
    kind: RunnerKind,
    target: String,
    log: CallLog,
    status: StatusCell,
}

#[async_trait::async_trait]
impl CommandRunner for FakeRunner {
    fn kind(&self) -> RunnerKind {
        self.kind
    }

    async fn run(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<String, CommandExecutionError> {
        let log = Arc::clone(&self.log);
        let target = self.target.clone();
        let text = command.to_string();

        if text.starts_with("panic") {
            log.lock().push((target, text));
            panic!("runner blew up");
        }

        supervise(&self.status, command, timeout, async move {
            log.lock().push((target, text.clone()));
            if let Some(ms) = text.strip_prefix("sleep ") {
                let ms: u64 = ms.trim().parse().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            if text.starts_with("fail") {
                return Err(CommandExecutionError::failed(text, 1, "", "boom"));
            }
            Ok(text.trim().to_string())
        })
        .await
    }

    fn status(&self) -> ExecutionStatus {
        self.status.snapshot()
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub log: CallLog,
}

impl RunnerFactory for FakeFactory {
    fn get_runner(
        &self,
        kind: RunnerKind,
        target: &str,
    ) -> Result<Box<dyn CommandRunner>, OrchestratorError> {
        Ok(Box::new(FakeRunner {
            kind,
            target: target.to_string(),
            log: Arc::clone(&self.log),
            status: StatusCell::new(),
        }))
    }
}

/// Sink that keeps every update.
#[derive(Default)]
pub struct RecordingSink {
    pub updates: Mutex<Vec<(String, String, String, String)>>,
}

impl RecordingSink {
    pub fn for_target(&self, target: &str) -> Vec<(String, String, String)> {
        self.updates
            .lock()
            .iter()
            .filter(|u| u.0 == target)
            .map(|u| (u.1.clone(), u.2.clone(), u.3.clone()))
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn update(&self, target: &str, task: &str, step: &str, result: &str) {
        self.updates.lock().push((
            target.to_string(),
            task.to_string(),
            step.to_string(),
            result.to_string(),
        ));
    }
}

pub fn cluster(managers: usize, workers: usize) -> Vec<TargetInstance> {
    let mut targets = Vec::new();
    for i in 1..=managers {
        targets.push(TargetInstance::new(format!("manager-{i}"), TargetRole::Manager));
    }
    for i in 1..=workers {
        targets.push(TargetInstance::new(format!("worker-{i}"), TargetRole::Worker));
    }
    targets
}
