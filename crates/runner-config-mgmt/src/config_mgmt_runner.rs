use std::time::Duration;
use swarm_core::error::CommandExecutionError;
use swarm_core::runner::{capture, supervise, CommandRunner};
use swarm_core::status::{ExecutionStatus, StatusCell};
use swarm_core::RunnerKind;
use tokio::process::Command;
use tracing::debug;

const SHELL_MODULE: &str = "ansible.builtin.shell";

/// Configuration-management runner: hands the command to an ad-hoc
/// `ansible <host> -m ansible.builtin.shell -a <command>` invocation.
#[derive(Debug)]
pub struct ConfigMgmtRunner {
    program: String,
    inventory: Option<String>,
    target: String,
    status: StatusCell,
}

impl ConfigMgmtRunner {
    pub fn new(program: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            inventory: None,
            target: target.into(),
            status: StatusCell::new(),
        }
    }

    /// Inventory file passed with `-i`.
    pub fn with_inventory(mut self, inventory: Option<String>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn command_line(&self, command: &str) -> Vec<String> {
        let mut args = vec![self.target.clone()];
        if let Some(inventory) = &self.inventory {
            args.push("-i".to_string());
            args.push(inventory.clone());
        }
        args.extend([
            "-m".to_string(),
            SHELL_MODULE.to_string(),
            "-a".to_string(),
            command.to_string(),
        ]);
        args
    }
}

#[async_trait::async_trait]
impl CommandRunner for ConfigMgmtRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::ConfigMgmt
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ad_hoc_arguments() {
        let runner = ConfigMgmtRunner::new("ansible", "worker-2");
        assert_eq!(
            runner.command_line("systemctl restart docker"),
            vec!["worker-2", "-m", "ansible.builtin.shell", "-a", "systemctl restart docker"]
        );
    }

    #[test]
    fn includes_inventory_when_set() {
        let runner = ConfigMgmtRunner::new("ansible", "manager-1")
            .with_inventory(Some("hosts.ini".to_string()));
        assert_eq!(
            runner.command_line("uptime"),
            vec!["manager-1", "-i", "hosts.ini", "-m", "ansible.builtin.shell", "-a", "uptime"]
        );
    }

    #[tokio::test]
    async fn failing_program_reports_exit_code() {
        let runner = ConfigMgmtRunner::new("false", "manager-1");
        let err = runner.run("uptime", None).await.unwrap_err();
        assert_eq!(err.return_code, 1);
        assert_eq!(runner.kind(), RunnerKind::ConfigMgmt);
    }
}
