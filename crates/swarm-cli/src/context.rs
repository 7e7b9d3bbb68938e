use crate::dispatch::DefaultRunnerFactory;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use swarm_core::config::Config;
use swarm_core::{Inventory, ParameterSet, StaticInventory, YamlInventory};
use tracing::warn;

/// Everything a subcommand needs, resolved from flags and the config file.
pub struct Context {
    pub config: Config,
    pub inventory: Arc<dyn Inventory>,
    pub runners: Arc<DefaultRunnerFactory>,
    pub parameters: ParameterSet,
}

impl Context {
    pub fn load(
        config_path: Option<&Path>,
        inventory: Option<PathBuf>,
        params: Vec<(String, String)>,
    ) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_from(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => Config::load_default()?,
        };

        let inventory: Arc<dyn Inventory> = match inventory.or_else(|| config.inventory.clone()) {
            Some(path) => Arc::new(YamlInventory::new(path)),
            None => {
                warn!("No inventory given; only host-level templates will bind");
                Arc::new(StaticInventory::new(Vec::new()))
            }
        };

        let runners = Arc::new(DefaultRunnerFactory::new(config.runners.clone())?);
        let parameters = ParameterSet::from_raw(params)?;

        Ok(Self {
            config,
            inventory,
            runners,
            parameters,
        })
    }
}

/// Parse a `KEY=VALUE` command-line parameter.
pub fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::ParameterKey;

    #[test]
    fn parses_key_value() {
        assert_eq!(
            parse_param("MANAGER_IP=10.0.0.2").unwrap(),
            ("MANAGER_IP".to_string(), "10.0.0.2".to_string())
        );
        assert_eq!(
            parse_param("JOIN_TOKEN=a=b").unwrap(),
            ("JOIN_TOKEN".to_string(), "a=b".to_string())
        );
        assert!(parse_param("MANAGER_IP").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn loads_context_from_explicit_files() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = dir.path().join("vms.yaml");
        std::fs::write(&inventory, "targets:\n  - name: manager-1\n    role: manager\n").unwrap();
        let config = dir.path().join("tinyswarm.yaml");
        std::fs::write(&config, format!("inventory: {}\n", inventory.display())).unwrap();

        let ctx = Context::load(
            Some(config.as_path()),
            None,
            vec![("manager_port".to_string(), "2377".to_string())],
        )
        .unwrap();

        assert_eq!(ctx.inventory.snapshot().unwrap().targets.len(), 1);
        assert_eq!(ctx.parameters.get(ParameterKey::ManagerPort), Some("2377"));
    }

    #[test]
    fn rejects_unknown_parameter_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("tinyswarm.yaml");
        std::fs::write(&config, "{}\n").unwrap();

        let result = Context::load(
            Some(config.as_path()),
            None,
            vec![("HOSTNAME".to_string(), "x".to_string())],
        );
        assert!(result.is_err());
    }
}
