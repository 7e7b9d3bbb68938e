use crate::command::RunnerKind;
use crate::error::{CommandExecutionError, OrchestratorError};
use crate::status::{ExecutionStatus, StatusCell};
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Executes one resolved command string against one execution context.
///
/// A runner instance serves a single command; its status is readable at any
/// time, including while `run` is in flight.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Kind tag this runner was created for.
    fn kind(&self) -> RunnerKind;

    /// Run `command`, returning trimmed stdout on success.
    async fn run(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<String, CommandExecutionError>;

    /// Current status of this runner.
    fn status(&self) -> ExecutionStatus;
}

/// Produces a fresh runner per executable command.
pub trait RunnerFactory: Send + Sync {
    /// `target` is the binding the command is built for. Runners that act on
    /// a named VM use it; the others ignore it.
    fn get_runner(
        &self,
        kind: RunnerKind,
        target: &str,
    ) -> Result<Box<dyn CommandRunner>, OrchestratorError>;
}

/// Drive `work` under the runner contract: mark the status running, enforce
/// the optional timeout, then record success or error.
///
/// On timeout `work` is dropped, which cancels whatever it was waiting on.
pub async fn supervise<F>(
    status: &StatusCell,
    command: &str,
    timeout: Option<Duration>,
    work: F,
) -> Result<String, CommandExecutionError>
where
    F: Future<Output = Result<String, CommandExecutionError>>,
{
    status.begin();
    debug!("Executing: {}", command);

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Command timed out after {:?}: {}", limit, command);
                Err(CommandExecutionError::timed_out(command, limit))
            }
        },
        None => work.await,
    };

    match &outcome {
        Ok(_) => status.succeed(),
        Err(e) => {
            error!(
                "Command failed with return code {}: {}",
                e.return_code,
                e.stderr.trim()
            );
            status.fail();
        }
    }
    outcome
}

/// Spawn `process` and collect its output. `command` is the resolved command
/// text, used for error reporting.
///
/// The child is killed if this future is dropped before it exits.
pub async fn capture(command: &str, mut process: Command) -> Result<String, CommandExecutionError> {
    process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = process
        .spawn()
        .map_err(|e| CommandExecutionError::unexpected(command, e))?;
    let output = child
        .wait_with_output()
        .await
        .map_err(|e| CommandExecutionError::unexpected(command, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if output.status.success() {
        Ok(stdout)
    } else {
        Err(CommandExecutionError::failed(
            command,
            output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        ))
    }
}
