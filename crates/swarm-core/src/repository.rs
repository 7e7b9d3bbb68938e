use crate::command::CommandTemplate;
use crate::error::OrchestratorError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of command templates, in declaration order.
pub trait CommandRepository: Send + Sync {
    fn commands(&self) -> Result<Vec<CommandTemplate>, OrchestratorError>;
}

impl CommandRepository for Vec<CommandTemplate> {
    fn commands(&self) -> Result<Vec<CommandTemplate>, OrchestratorError> {
        Ok(self.clone())
    }
}

#[derive(Debug, Deserialize)]
struct CommandFile {
    commands: Vec<CommandTemplate>,
}

/// Templates stored as a `commands:` list in a YAML file.
#[derive(Debug, Clone)]
pub struct YamlCommandRepository {
    path: PathBuf,
}

impl YamlCommandRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse templates from YAML text.
    pub fn parse(contents: &str) -> Result<Vec<CommandTemplate>, OrchestratorError> {
        let file: CommandFile = serde_yaml::from_str(contents)?;
        for template in &file.commands {
            if template.roles.is_empty() {
                return Err(OrchestratorError::EmptyRoles {
                    index: template.index,
                });
            }
        }
        Ok(file.commands)
    }
}

impl CommandRepository for YamlCommandRepository {
    fn commands(&self) -> Result<Vec<CommandTemplate>, OrchestratorError> {
        debug!("Loading command templates from {}", self.path.display());
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            OrchestratorError::Config(format!(
                "cannot read command file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Self::parse(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RunnerKind;
    use crate::target::TargetRole;

    const SWARM_JOIN: &str = r#"
commands:
  - index: 1
    description: Install docker on {TARGET_NAME}
    command: multipass exec {TARGET_NAME} -- sh -c 'curl -fsSL https://get.docker.com | sh'
    runner: async
    roles: [manager, worker]
  - index: 2
    description: Join swarm
    command: docker swarm join --token {JOIN_TOKEN} {MANAGER_IP}:{MANAGER_PORT}
    runner: remote_exec
    roles: [worker]
"#;

    #[test]
    fn parses_templates_in_declaration_order() {
        let templates = YamlCommandRepository::parse(SWARM_JOIN).unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].roles, vec![TargetRole::Manager, TargetRole::Worker]);
        assert_eq!(templates[1].runner, RunnerKind::RemoteExec);
    }

    #[test]
    fn empty_roles_are_rejected() {
        let yaml = "commands:\n  - index: 7\n    command: ls\n    runner: async\n    roles: []\n";
        let err = YamlCommandRepository::parse(yaml).unwrap_err();
        assert!(matches!(err, OrchestratorError::EmptyRoles { index: 7 }));
    }

    #[test]
    fn unknown_role_fails_to_load() {
        let yaml =
            "commands:\n  - index: 1\n    command: ls\n    runner: async\n    roles: [bastion]\n";
        let err = YamlCommandRepository::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("Unknown target role"));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("join.yaml");
        std::fs::write(&path, SWARM_JOIN).unwrap();

        let templates = YamlCommandRepository::new(&path).commands().unwrap();
        assert_eq!(templates[1].index, 2);
    }
}
