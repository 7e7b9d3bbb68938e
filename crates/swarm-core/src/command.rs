use crate::error::OrchestratorError;
use crate::runner::CommandRunner;
use crate::target::TargetRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which [`CommandRunner`] implementation executes a template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum RunnerKind {
    LocalAsync,
    RemoteExec,
    Rest,
    ConfigMgmt,
}

impl RunnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerKind::LocalAsync => "local_async",
            RunnerKind::RemoteExec => "remote_exec",
            RunnerKind::Rest => "rest",
            RunnerKind::ConfigMgmt => "config_mgmt",
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunnerKind {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local_async" | "async" | "local" => Ok(RunnerKind::LocalAsync),
            "remote_exec" | "multipass" => Ok(RunnerKind::RemoteExec),
            "rest" => Ok(RunnerKind::Rest),
            "config_mgmt" | "ansible" => Ok(RunnerKind::ConfigMgmt),
            _ => Err(OrchestratorError::UnsupportedRunner(s.to_string())),
        }
    }
}

impl TryFrom<String> for RunnerKind {
    type Error = OrchestratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RunnerKind> for String {
    fn from(kind: RunnerKind) -> Self {
        kind.as_str().to_string()
    }
}

fn default_host_bucket() -> String {
    "host".to_string()
}

fn default_roles() -> Vec<TargetRole> {
    vec![TargetRole::Host]
}

/// A command definition with `{KEY}` placeholders, not yet bound to a target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandTemplate {
    /// Execution order within whichever target the template lands in.
    pub index: u32,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(alias = "runner_kind")]
    pub runner: RunnerKind,
    #[serde(default = "default_host_bucket", alias = "command_type")]
    pub host_bucket: String,
    #[serde(default = "default_roles", alias = "vm_type")]
    pub roles: Vec<TargetRole>,
}

impl CommandTemplate {
    pub fn new(index: u32, command: impl Into<String>, runner: RunnerKind) -> Self {
        Self {
            index,
            description: String::new(),
            command: command.into(),
            runner,
            host_bucket: default_host_bucket(),
            roles: default_roles(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn for_roles(mut self, roles: impl IntoIterator<Item = TargetRole>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn in_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.host_bucket = bucket.into();
        self
    }
}

/// A template resolved for one target, ready to run.
pub struct ExecutableCommand {
    pub index: u32,
    pub target_name: String,
    pub description: String,
    pub command: String,
    pub runner_kind: RunnerKind,
    pub runner: Box<dyn CommandRunner>,
}

impl fmt::Debug for ExecutableCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableCommand")
            .field("index", &self.index)
            .field("target_name", &self.target_name)
            .field("description", &self.description)
            .field("command", &self.command)
            .field("runner_kind", &self.runner_kind)
            .finish()
    }
}

/// Output of the command builder: each target's commands in run order.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    targets: BTreeMap<String, Vec<ExecutableCommand>>,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to `target`'s list. Ordering is restored by [`Self::sort`].
    pub fn push(&mut self, command: ExecutableCommand) {
        self.targets
            .entry(command.target_name.clone())
            .or_default()
            .push(command);
    }

    /// Stable sort by index, so equal indices keep declaration order.
    pub fn sort(&mut self) {
        for commands in self.targets.values_mut() {
            commands.sort_by_key(|c| c.index);
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn commands(&self, target: &str) -> &[ExecutableCommand] {
        self.targets.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ExecutableCommand])> {
        self.targets.iter().map(|(t, c)| (t.as_str(), c.as_slice()))
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn command_count(&self) -> usize {
        self.targets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<ExecutableCommand>> {
        self.targets
    }

    /// Plain JSON view for `plan --json` style output.
    pub fn to_json(&self) -> serde_json::Value {
        let targets: serde_json::Map<String, serde_json::Value> = self
            .targets
            .iter()
            .map(|(target, commands)| {
                let entries: Vec<serde_json::Value> = commands
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "index": c.index,
                            "description": c.description,
                            "command": c.command,
                            "runner": c.runner_kind.as_str(),
                        })
                    })
                    .collect();
                (target.clone(), serde_json::Value::Array(entries))
            })
            .collect();
        serde_json::Value::Object(targets)
    }
}

impl FromIterator<ExecutableCommand> for ExecutionPlan {
    fn from_iter<T: IntoIterator<Item = ExecutableCommand>>(iter: T) -> Self {
        let mut plan = ExecutionPlan::new();
        for command in iter {
            plan.push(command);
        }
        plan
    }
}
