use std::path::Path;
use swarm_core::Config;

const SAMPLE_CONFIG: &str = r#"# tinyswarm configuration

# Inventory used when --inventory is not given
inventory: vms.yaml

runners:
  remote_program: multipass
  # rest_base_url: http://127.0.0.1:9000
  config_mgmt_program: ansible
  # config_mgmt_inventory: hosts.ini

defaults:
  command_timeout_secs: 120
  strict_manager: false
"#;

pub fn run(explicit: Option<&Path>, path: bool, init: bool) -> anyhow::Result<()> {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config already exists at: {}", config_path.display());
            println!("Remove it first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        println!("Sample config written to: {}", config_path.display());
        return Ok(());
    }

    println!("Config path: {}", config_path.display());
    if config_path.exists() {
        let config = Config::load_from(&config_path)?;
        println!(
            "Inventory:   {}",
            config
                .inventory
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".into())
        );
        println!("Remote exec: {}", config.runners.remote_program);
        println!("REST base:   {}", config.runners.rest_base_url.as_deref().unwrap_or("-"));
        println!("Timeout:     {}s", config.defaults.command_timeout_secs);
        println!("Strict mgr:  {}", config.defaults.strict_manager);
    } else {
        println!("Status:      not found");
        println!("Run `tinyswarm config --init` to create one.");
    }

    Ok(())
}
