use crate::command::{CommandTemplate, ExecutionPlan};
use crate::error::OrchestratorError;
use crate::inventory::Inventory;
use crate::parameter::ParameterSet;
use crate::runner::RunnerFactory;
use crate::strategy::{BuildContext, HostStrategy, ManagerStrategy, RoleStrategy, WorkerStrategy};
use crate::target::TargetRole;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Expands command templates into per-target executable commands.
///
/// Pure transformation: nothing is executed, and the same inventory and
/// templates always produce the same plan.
pub struct CommandBuilder {
    inventory: Arc<dyn Inventory>,
    runners: Arc<dyn RunnerFactory>,
    strategies: HashMap<TargetRole, Box<dyn RoleStrategy>>,
    parameters: ParameterSet,
}

impl CommandBuilder {
    /// Builder with the manager, worker and host strategies registered.
    pub fn new(inventory: Arc<dyn Inventory>, runners: Arc<dyn RunnerFactory>) -> Self {
        Self::with_strategies(
            inventory,
            runners,
            vec![
                Box::new(ManagerStrategy::new()),
                Box::new(WorkerStrategy),
                Box::new(HostStrategy),
            ],
        )
    }

    /// Builder with exactly `strategies`. A template addressed to a role with
    /// no strategy here fails the build.
    pub fn with_strategies(
        inventory: Arc<dyn Inventory>,
        runners: Arc<dyn RunnerFactory>,
        strategies: Vec<Box<dyn RoleStrategy>>,
    ) -> Self {
        Self {
            inventory,
            runners,
            strategies: strategies.into_iter().map(|s| (s.role(), s)).collect(),
            parameters: ParameterSet::new(),
        }
    }

    /// Replace the registered manager strategy with the strict variant.
    pub fn strict_manager(mut self, strict: bool) -> Self {
        if self.strategies.contains_key(&TargetRole::Manager) {
            self.strategies
                .insert(TargetRole::Manager, Box::new(ManagerStrategy::strict(strict)));
        }
        self
    }

    /// Values discovered earlier in the run (manager address, join token).
    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Expand every template against a fresh inventory snapshot.
    ///
    /// All templates are validated before any is bound, so configuration
    /// errors surface before any partial plan exists.
    pub fn build(&self, templates: &[CommandTemplate]) -> Result<ExecutionPlan, OrchestratorError> {
        for template in templates {
            self.check(template)?;
        }

        let inventory = self.inventory.snapshot()?;
        let ctx = BuildContext {
            inventory: &inventory,
            runners: self.runners.as_ref(),
        };

        let mut plan = ExecutionPlan::new();
        for template in templates {
            for role in &template.roles {
                let strategy = self.strategy(*role)?;
                strategy.categorize(template, &ctx, &self.parameters, &mut plan)?;
            }
        }
        plan.sort();

        info!(
            "Built plan with {} commands across {} targets",
            plan.command_count(),
            plan.target_count()
        );
        Ok(plan)
    }

    fn check(&self, template: &CommandTemplate) -> Result<(), OrchestratorError> {
        if template.roles.is_empty() {
            return Err(OrchestratorError::EmptyRoles {
                index: template.index,
            });
        }
        for role in &template.roles {
            self.strategy(*role)?;
        }
        Ok(())
    }

    fn strategy(&self, role: TargetRole) -> Result<&dyn RoleStrategy, OrchestratorError> {
        self.strategies
            .get(&role)
            .map(|s| s.as_ref())
            .ok_or_else(|| OrchestratorError::UnknownRole(role.to_string()))
    }
}
