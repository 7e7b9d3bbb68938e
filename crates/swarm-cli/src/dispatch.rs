use runner_config_mgmt::ConfigMgmtRunner;
use runner_local::LocalAsyncRunner;
use runner_remote::RemoteExecRunner;
use runner_rest::RestRunner;
use swarm_core::config::RunnerSettings;
use swarm_core::error::OrchestratorError;
use swarm_core::runner::{CommandRunner, RunnerFactory};
use swarm_core::RunnerKind;

/// Creates runner instances from the runner settings in the config.
pub struct DefaultRunnerFactory {
    settings: RunnerSettings,
}

impl DefaultRunnerFactory {
    /// Fails early when the configured REST base URL does not parse.
    pub fn new(settings: RunnerSettings) -> Result<Self, OrchestratorError> {
        rest_runner(&settings)?;
        Ok(Self { settings })
    }
}

impl RunnerFactory for DefaultRunnerFactory {
    fn get_runner(
        &self,
        kind: RunnerKind,
        target: &str,
    ) -> Result<Box<dyn CommandRunner>, OrchestratorError> {
        match kind {
            RunnerKind::LocalAsync => Ok(Box::new(LocalAsyncRunner::new())),
            RunnerKind::RemoteExec => Ok(Box::new(RemoteExecRunner::new(
                &self.settings.remote_program,
                target,
            ))),
            RunnerKind::Rest => Ok(Box::new(rest_runner(&self.settings)?)),
            RunnerKind::ConfigMgmt => Ok(Box::new(
                ConfigMgmtRunner::new(&self.settings.config_mgmt_program, target)
                    .with_inventory(self.settings.config_mgmt_inventory.clone()),
            )),
        }
    }
}

fn rest_runner(settings: &RunnerSettings) -> Result<RestRunner, OrchestratorError> {
    RestRunner::new(settings.rest_base_url.as_deref())
        .map_err(|e| OrchestratorError::Config(format!("rest_base_url: {}", e)))
}
