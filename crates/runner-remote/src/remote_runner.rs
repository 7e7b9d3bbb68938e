use std::time::Duration;
use swarm_core::error::CommandExecutionError;
use swarm_core::runner::{capture, supervise, CommandRunner};
use swarm_core::status::{ExecutionStatus, StatusCell};
use swarm_core::RunnerKind;
use tokio::process::Command;
use tracing::debug;

/// Remote exec runner: runs the command inside a named VM through the VM
/// manager's CLI, i.e. `multipass exec <vm> -- sh -c <command>`.
#[derive(Debug)]
pub struct RemoteExecRunner {
    program: String,
    target: String,
    status: StatusCell,
}

impl RemoteExecRunner {
    pub fn new(program: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            target: target.into(),
            status: StatusCell::new(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Arguments handed to the VM manager CLI. The command stays a single
    /// argument so the guest shell sees it unchanged.
    pub fn command_line(&self, command: &str) -> Vec<String> {
        vec![
            "exec".to_string(),
            self.target.clone(),
            "--".to_string(),
            "sh".to_string(),
            "-c".to_string(),
            command.to_string(),
        ]
    }
}

#[async_trait::async_trait]
impl CommandRunner for RemoteExecRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::RemoteExec
    }

    async fn run(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<String, CommandExecutionError> {
        let args = self.command_line(command);
        debug!("Running: {} {}", self.program, args.join(" "));

        let mut process = Command::new(&self.program);
        process.args(&args);

        supervise(&self.status, command, timeout, capture(command, process)).await
    }

    fn status(&self) -> ExecutionStatus {
        self.status.snapshot()
    }
}
