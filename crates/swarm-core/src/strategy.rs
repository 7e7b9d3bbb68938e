use crate::command::{CommandTemplate, ExecutableCommand, ExecutionPlan};
use crate::error::OrchestratorError;
use crate::inventory::InventorySnapshot;
use crate::parameter::{substitute, ParameterKey, ParameterSet};
use crate::runner::RunnerFactory;
use crate::target::TargetRole;
use tracing::{debug, warn};

/// What a strategy may consult while binding a template.
pub struct BuildContext<'a> {
    pub inventory: &'a InventorySnapshot,
    pub runners: &'a dyn RunnerFactory,
}

/// Decides which targets a template binds to for one role, and appends one
/// executable command per binding to the plan.
pub trait RoleStrategy: Send + Sync {
    fn role(&self) -> TargetRole;

    fn categorize(
        &self,
        template: &CommandTemplate,
        ctx: &BuildContext<'_>,
        params: &ParameterSet,
        out: &mut ExecutionPlan,
    ) -> Result<(), OrchestratorError>;
}

/// Resolve `template` for `target`. Nothing is produced unless both the
/// command and its description substitute cleanly.
fn bind(
    template: &CommandTemplate,
    target: &str,
    params: &ParameterSet,
    ctx: &BuildContext<'_>,
) -> Result<ExecutableCommand, OrchestratorError> {
    let command = substitute(&template.command, params)?;
    let description = substitute(&template.description, params)?;
    let runner = ctx.runners.get_runner(template.runner, target)?;

    debug!("Bound template {} to {}: {}", template.index, target, command);
    Ok(ExecutableCommand {
        index: template.index,
        target_name: target.to_string(),
        description,
        command,
        runner_kind: template.runner,
        runner,
    })
}

/// Binds to the single manager VM.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManagerStrategy {
    strict: bool,
}

impl ManagerStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat anything other than exactly one manager as a configuration error
    /// instead of skipping the template.
    pub fn strict(strict: bool) -> Self {
        Self { strict }
    }
}

impl RoleStrategy for ManagerStrategy {
    fn role(&self) -> TargetRole {
        TargetRole::Manager
    }

    fn categorize(
        &self,
        template: &CommandTemplate,
        ctx: &BuildContext<'_>,
        params: &ParameterSet,
        out: &mut ExecutionPlan,
    ) -> Result<(), OrchestratorError> {
        let managers = ctx.inventory.find_by_role(TargetRole::Manager);

        match managers.as_slice() {
            [manager] => {
                let params = params.clone().with(ParameterKey::TargetName, *manager);
                out.push(bind(template, manager, &params, ctx)?);
                Ok(())
            }
            others if self.strict => Err(OrchestratorError::ManagerCardinality {
                found: others.len(),
            }),
            others => {
                warn!(
                    "Skipping template {} for managers: expected exactly one, found {}",
                    template.index,
                    others.len()
                );
                Ok(())
            }
        }
    }
}

/// Binds once per worker VM, each with its own TARGET_NAME.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerStrategy;

impl RoleStrategy for WorkerStrategy {
    fn role(&self) -> TargetRole {
        TargetRole::Worker
    }

    fn categorize(
        &self,
        template: &CommandTemplate,
        ctx: &BuildContext<'_>,
        params: &ParameterSet,
        out: &mut ExecutionPlan,
    ) -> Result<(), OrchestratorError> {
        for worker in ctx.inventory.find_by_role(TargetRole::Worker) {
            let per_worker = params.clone().with(ParameterKey::TargetName, worker);
            out.push(bind(template, worker, &per_worker, ctx)?);
        }
        Ok(())
    }
}

/// Binds to the template's host bucket without looking at the inventory.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostStrategy;

impl RoleStrategy for HostStrategy {
    fn role(&self) -> TargetRole {
        TargetRole::Host
    }

    fn categorize(
        &self,
        template: &CommandTemplate,
        ctx: &BuildContext<'_>,
        params: &ParameterSet,
        out: &mut ExecutionPlan,
    ) -> Result<(), OrchestratorError> {
        let bucket = template.host_bucket.trim();
        if bucket.is_empty() {
            return Err(OrchestratorError::Config(format!(
                "host-level template {} has an empty host bucket",
                template.index
            )));
        }
        out.push(bind(template, bucket, params, ctx)?);
        Ok(())
    }
}
