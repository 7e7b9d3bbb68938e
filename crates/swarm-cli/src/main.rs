use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod console;
mod context;
mod dispatch;

#[derive(Parser)]
#[command(name = "tinyswarm")]
#[command(about = "Provision a Docker Swarm cluster from command templates", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/tinyswarm/tinyswarm.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PlanArgs {
    /// Inventory file (overrides the config)
    #[arg(short, long)]
    inventory: Option<PathBuf>,

    /// Parameter value, repeatable (e.g. --param MANAGER_IP=10.0.0.2)
    #[arg(short, long = "param", value_parser = context::parse_param)]
    params: Vec<(String, String)>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and execute a template file
    Run {
        /// Command template file
        templates: PathBuf,

        #[command(flatten)]
        args: PlanArgs,
    },

    /// Build a template file and print the plan without executing it
    Plan {
        /// Command template file
        templates: PathBuf,

        #[command(flatten)]
        args: PlanArgs,
    },

    /// Run a staged pipeline file
    Pipeline {
        /// Pipeline file
        file: PathBuf,

        #[command(flatten)]
        args: PlanArgs,
    },

    /// List inventory targets
    Targets {
        /// Inventory file (overrides the config)
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show or initialize configuration
    Config {
        /// Print config file path only
        #[arg(long)]
        path: bool,

        /// Write a sample config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    use Commands::*;

    match cli.command {
        Run { templates, args } => {
            let ctx = context::Context::load(cli.config.as_deref(), args.inventory, args.params)?;
            commands::run(&ctx, &templates, args.json).await?;
        }
        Plan { templates, args } => {
            let ctx = context::Context::load(cli.config.as_deref(), args.inventory, args.params)?;
            commands::plan(&ctx, &templates, args.json)?;
        }
        Pipeline { file, args } => {
            let ctx = context::Context::load(cli.config.as_deref(), args.inventory, args.params)?;
            commands::pipeline(&ctx, &file, args.json).await?;
        }
        Targets { inventory, json } => {
            let ctx = context::Context::load(cli.config.as_deref(), inventory, Vec::new())?;
            commands::targets(&ctx, json)?;
        }
        Config { path, init } => {
            commands::config(cli.config.as_deref(), path, init)?;
        }
    }

    Ok(())
}
