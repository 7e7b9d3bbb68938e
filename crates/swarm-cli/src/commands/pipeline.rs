use crate::commands::run::{coordinator, print_report};
use crate::context::Context;
use std::path::Path;
use swarm_core::pipeline::load_stages;
use swarm_core::Pipeline;

pub async fn run(ctx: &Context, file: &Path, json: bool) -> anyhow::Result<()> {
    let stages = load_stages(file)?;
    eprintln!("🔍 Pipeline with {} stage(s)", stages.len());

    let report = Pipeline::new(ctx.inventory.clone(), ctx.runners.clone(), coordinator(ctx))
        .strict_manager(ctx.config.defaults.strict_manager)
        .with_parameters(ctx.parameters.clone())
        .run(&stages)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for stage in &report.stages {
            println!("== {} ==", stage.name);
            print_report(&stage.report);
            println!();
        }
    }

    if !report.is_success() {
        anyhow::bail!("pipeline finished with failed commands");
    }
    Ok(())
}
