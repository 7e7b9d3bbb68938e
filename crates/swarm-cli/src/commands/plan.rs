use crate::context::Context;
use std::path::Path;
use swarm_core::repository::{CommandRepository, YamlCommandRepository};
use swarm_core::CommandBuilder;

pub fn run(ctx: &Context, templates: &Path, json: bool) -> anyhow::Result<()> {
    let templates = YamlCommandRepository::new(templates).commands()?;
    let plan = CommandBuilder::new(ctx.inventory.clone(), ctx.runners.clone())
        .strict_manager(ctx.config.defaults.strict_manager)
        .with_parameters(ctx.parameters.clone())
        .build(&templates)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan.to_json())?);
        return Ok(());
    }

    if plan.is_empty() {
        println!("No commands bound.");
        return Ok(());
    }
    for (target, commands) in plan.iter() {
        println!("{}:", target);
        for c in commands {
            println!("  [{:>3}] {:<12} {}", c.index, c.runner_kind.as_str(), c.command);
        }
    }
    println!(
        "\n{} commands across {} targets",
        plan.command_count(),
        plan.target_count()
    );
    Ok(())
}
