use std::time::Duration;
use swarm_core::error::CommandExecutionError;
use swarm_core::runner::{capture, supervise, CommandRunner};
use swarm_core::status::{ExecutionStatus, StatusCell};
use swarm_core::RunnerKind;
use tokio::process::Command;
use tracing::debug;

/// Local runner: runs the command through `sh -c` on the orchestrating host.
#[derive(Debug, Default)]
pub struct LocalAsyncRunner {
    shell: Option<String>,
    status: StatusCell,
}

impl LocalAsyncRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different POSIX shell than `sh`.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: Some(shell.into()),
            status: StatusCell::new(),
        }
    }

    fn shell(&self) -> &str {
        self.shell.as_deref().unwrap_or("sh")
    }
}

#[async_trait::async_trait]
impl CommandRunner for LocalAsyncRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::LocalAsync
    }

    async fn run(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<String, CommandExecutionError> {
        debug!("Local exec: {} -c {}", self.shell(), command);
        let mut process = Command::new(self.shell());
        process.arg("-c").arg(command);

        supervise(&self.status, command, timeout, capture(command, process)).await
    }

    fn status(&self) -> ExecutionStatus {
        self.status.snapshot()
    }
}
