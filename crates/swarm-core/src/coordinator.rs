use crate::command::{ExecutableCommand, ExecutionPlan};
use crate::error::CommandExecutionError;
use crate::status::{
    StatusResult, StatusSink, RESULT_FAILED, STEP_ERROR, STEP_EXECUTING, STEP_FINISHING,
    TASK_CLOSING,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { output: String },
    Failed { error: CommandExecutionError },
}

/// Result of one executable command.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommandOutcome {
    pub index: u32,
    pub description: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { output } => Some(output),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&CommandExecutionError> {
        match &self.outcome {
            Outcome::Failed { error } => Some(error),
            Outcome::Success { .. } => None,
        }
    }
}

/// Everything `execute` learned about a run. The caller decides what counts
/// as overall success.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub targets: BTreeMap<String, Vec<CommandOutcome>>,
    /// Targets whose task ended abnormally (panic) before draining its list.
    pub aborted: Vec<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.aborted.is_empty() && self.targets.values().flatten().all(CommandOutcome::is_success)
    }

    pub fn failures(&self) -> Vec<(&str, &CommandOutcome)> {
        self.targets
            .iter()
            .flat_map(|(t, outcomes)| outcomes.iter().map(move |o| (t.as_str(), o)))
            .filter(|(_, o)| !o.is_success())
            .collect()
    }

    pub fn outcomes(&self, target: &str) -> &[CommandOutcome] {
        self.targets.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Output of the command with `index` on `target`, if it succeeded.
    pub fn output(&self, target: &str, index: u32) -> Option<&str> {
        self.outcomes(target)
            .iter()
            .find(|o| o.index == index)
            .and_then(CommandOutcome::output)
    }

    pub fn command_count(&self) -> usize {
        self.targets.values().map(Vec::len).sum()
    }
}

/// Runs a plan: targets in parallel, each target's commands in order.
pub struct ExecutionCoordinator {
    sink: Arc<dyn StatusSink>,
    timeout: Option<Duration>,
}

impl ExecutionCoordinator {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            sink,
            timeout: None,
        }
    }

    /// Per-command timeout handed to every runner.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute every target's command list to completion.
    ///
    /// A failed command never stops the rest of its target's list, and never
    /// affects other targets. A panicking runner counts as a failed command.
    /// Returns once every target has finished.
    pub async fn execute(&self, plan: ExecutionPlan) -> RunReport {
        let run_id = RunId::new();
        let started_at = Utc::now();
        info!("Run {} started with {} targets", run_id, plan.target_count());

        let mut names = Vec::new();
        let mut handles = Vec::new();
        for (target, commands) in plan.into_inner() {
            let sink = Arc::clone(&self.sink);
            let timeout = self.timeout;
            names.push(target.clone());
            handles.push(tokio::spawn(run_target(target, commands, sink, timeout)));
        }

        let mut targets = BTreeMap::new();
        let mut aborted = Vec::new();
        for (target, joined) in names.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(outcomes) => {
                    targets.insert(target, outcomes);
                }
                Err(e) => {
                    error!("Target {} aborted: {}", target, e);
                    self.sink.update(&target, TASK_CLOSING, STEP_FINISHING, RESULT_FAILED);
                    targets.insert(target.clone(), Vec::new());
                    aborted.push(target);
                }
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            targets,
            aborted,
        };
        info!(
            "Run {} finished: {} commands, {} failed",
            report.run_id,
            report.command_count(),
            report.failures().len()
        );
        report
    }
}

/// One target's unit of work. Commands run strictly one after another.
async fn run_target(
    target: String,
    mut commands: Vec<ExecutableCommand>,
    sink: Arc<dyn StatusSink>,
    timeout: Option<Duration>,
) -> Vec<CommandOutcome> {
    commands.sort_by_key(|c| c.index);
    info!("Executing {} commands on {}", commands.len(), target);

    let mut outcomes = Vec::with_capacity(commands.len());
    for command in commands {
        sink.update(
            &target,
            &command.description,
            STEP_EXECUTING,
            &StatusResult::Running.to_string(),
        );

        let run = AssertUnwindSafe(command.runner.run(&command.command, timeout))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(CommandExecutionError::unexpected(
                    &command.command,
                    format!("runner panicked: {}", panic_message(panic.as_ref())),
                ))
            });

        let outcome = match run {
            Ok(output) => {
                let status = command.runner.status();
                sink.update(
                    &target,
                    &command.description,
                    &status.current_step,
                    &status.result.to_string(),
                );
                info!("Command {} succeeded on {}", command.index, target);
                Outcome::Success { output }
            }
            Err(error) => {
                warn!(
                    "Command {} failed on {} (return code {}), continuing",
                    command.index, target, error.return_code
                );
                sink.update(&target, &command.description, STEP_ERROR, RESULT_FAILED);
                Outcome::Failed { error }
            }
        };

        outcomes.push(CommandOutcome {
            index: command.index,
            description: command.description,
            outcome,
        });
    }

    sink.update(
        &target,
        TASK_CLOSING,
        STEP_FINISHING,
        &StatusResult::Success.to_string(),
    );
    outcomes
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
