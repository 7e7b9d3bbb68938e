use crate::builder::CommandBuilder;
use crate::command::CommandTemplate;
use crate::coordinator::{ExecutionCoordinator, RunReport};
use crate::error::OrchestratorError;
use crate::inventory::Inventory;
use crate::parameter::{ParameterKey, ParameterSet};
use crate::repository::{CommandRepository, YamlCommandRepository};
use crate::runner::RunnerFactory;
use crate::target::TargetRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Feeds one command's output into the parameters of later stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub key: ParameterKey,
    pub index: u32,
    /// Target (or host bucket) the command ran on.
    #[serde(default)]
    pub target: Option<String>,
    /// Alternatively, the role whose single target ran the command.
    #[serde(default)]
    pub role: Option<TargetRole>,
    /// Keep only this whitespace-separated field of the output.
    #[serde(default)]
    pub field: Option<usize>,
}

impl Capture {
    fn failed(&self, target: &str, reason: impl Into<String>) -> OrchestratorError {
        OrchestratorError::CaptureFailed {
            key: self.key.to_string(),
            target: target.to_string(),
            index: self.index,
            reason: reason.into(),
        }
    }

    /// A capture names its source by exactly one of `target` or `role`.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        match (&self.target, self.role) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(self.ambiguous_source()),
        }
    }

    fn ambiguous_source(&self) -> OrchestratorError {
        OrchestratorError::Config(format!(
            "capture of {} needs exactly one of 'target' or 'role'",
            self.key
        ))
    }

    fn source(&self, inventory: &dyn Inventory) -> Result<String, OrchestratorError> {
        match (&self.target, self.role) {
            (Some(target), None) => Ok(target.clone()),
            (None, Some(role)) => {
                let snapshot = inventory.snapshot()?;
                match snapshot.find_by_role(role).as_slice() {
                    [only] => Ok(only.to_string()),
                    others => Err(self.failed(
                        role.as_str(),
                        format!("role resolves to {} targets", others.len()),
                    )),
                }
            }
            _ => Err(self.ambiguous_source()),
        }
    }

    /// Pull the captured value out of a finished stage.
    pub fn resolve(
        &self,
        report: &RunReport,
        inventory: &dyn Inventory,
    ) -> Result<String, OrchestratorError> {
        let target = self.source(inventory)?;
        let outcome = report
            .outcomes(&target)
            .iter()
            .find(|o| o.index == self.index)
            .ok_or_else(|| self.failed(&target, "no such command in the stage"))?;

        let output = match (outcome.output(), outcome.error()) {
            (Some(output), _) => output.trim(),
            (None, Some(error)) => return Err(self.failed(&target, error.to_string())),
            (None, None) => return Err(self.failed(&target, "command produced no result")),
        };

        let value = match self.field {
            Some(n) => output
                .split_whitespace()
                .nth(n)
                .ok_or_else(|| self.failed(&target, format!("output has no field {}", n)))?,
            None => output,
        };
        if value.is_empty() {
            return Err(self.failed(&target, "output is empty"));
        }
        Ok(value.to_string())
    }
}

/// One step of a pipeline: a template set plus what to capture from it.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub templates: Vec<CommandTemplate>,
    pub parameters: ParameterSet,
    pub captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct StageEntry {
    name: String,
    commands: PathBuf,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct PipelineFile {
    stages: Vec<StageEntry>,
}

/// Load stages from a pipeline file. Command files are resolved relative to
/// the pipeline file's directory.
pub fn load_stages(path: &Path) -> Result<Vec<Stage>, OrchestratorError> {
    let contents = std::fs::read_to_string(path)?;
    let file: PipelineFile = serde_yaml::from_str(&contents)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    file.stages
        .into_iter()
        .map(|entry| {
            let commands_path = if entry.commands.is_absolute() {
                entry.commands
            } else {
                base.join(entry.commands)
            };
            for capture in &entry.captures {
                capture.validate()?;
            }
            Ok(Stage {
                name: entry.name,
                templates: YamlCommandRepository::new(commands_path).commands()?,
                parameters: ParameterSet::from_raw(entry.parameters)?,
                captures: entry.captures,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: String,
    pub report: RunReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    /// Parameters in effect after the last stage, captures included.
    pub parameters: ParameterSet,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.stages.iter().all(|s| s.report.is_success())
    }
}

/// Runs stages in order, each built against a fresh inventory snapshot with
/// every value captured so far.
pub struct Pipeline {
    inventory: Arc<dyn Inventory>,
    runners: Arc<dyn RunnerFactory>,
    coordinator: ExecutionCoordinator,
    parameters: ParameterSet,
    strict_manager: bool,
}

impl Pipeline {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        runners: Arc<dyn RunnerFactory>,
        coordinator: ExecutionCoordinator,
    ) -> Self {
        Self {
            inventory,
            runners,
            coordinator,
            parameters: ParameterSet::new(),
            strict_manager: false,
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn strict_manager(mut self, strict: bool) -> Self {
        self.strict_manager = strict;
        self
    }

    /// Failed commands are reported and do not stop the pipeline; a capture
    /// that cannot be satisfied does, since later stages depend on it.
    pub async fn run(&self, stages: &[Stage]) -> Result<PipelineReport, OrchestratorError> {
        for capture in stages.iter().flat_map(|s| &s.captures) {
            capture.validate()?;
        }

        let mut parameters = self.parameters.clone();
        let mut reports = Vec::with_capacity(stages.len());

        for stage in stages {
            info!("Stage '{}': {} templates", stage.name, stage.templates.len());
            parameters.merge(&stage.parameters);

            let plan = CommandBuilder::new(Arc::clone(&self.inventory), Arc::clone(&self.runners))
                .strict_manager(self.strict_manager)
                .with_parameters(parameters.clone())
                .build(&stage.templates)?;
            let report = self.coordinator.execute(plan).await;

            for capture in &stage.captures {
                let value = capture.resolve(&report, self.inventory.as_ref())?;
                info!("Stage '{}' captured {} = {}", stage.name, capture.key, value);
                parameters.insert(capture.key, value);
            }

            reports.push(StageReport {
                name: stage.name.clone(),
                report,
            });
        }

        Ok(PipelineReport {
            stages: reports,
            parameters,
        })
    }
}
