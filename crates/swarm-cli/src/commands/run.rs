use crate::console::ConsoleSink;
use crate::context::Context;
use std::path::Path;
use std::sync::Arc;
use swarm_core::repository::{CommandRepository, YamlCommandRepository};
use swarm_core::status::{SinkSet, TracingSink};
use swarm_core::{CommandBuilder, ExecutionCoordinator, RunReport};

pub async fn run(ctx: &Context, templates: &Path, json: bool) -> anyhow::Result<()> {
    let templates = YamlCommandRepository::new(templates).commands()?;
    let plan = CommandBuilder::new(ctx.inventory.clone(), ctx.runners.clone())
        .strict_manager(ctx.config.defaults.strict_manager)
        .with_parameters(ctx.parameters.clone())
        .build(&templates)?;

    let report = coordinator(ctx).execute(plan).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        anyhow::bail!("{} command(s) failed", report.failures().len() + report.aborted.len());
    }
    Ok(())
}

/// Coordinator reporting to the console and the log.
pub(crate) fn coordinator(ctx: &Context) -> ExecutionCoordinator {
    let sink = SinkSet::new(vec![Arc::new(ConsoleSink), Arc::new(TracingSink)]);
    ExecutionCoordinator::new(Arc::new(sink)).with_timeout(ctx.config.defaults.command_timeout())
}

pub(crate) fn print_report(report: &RunReport) {
    if report.targets.is_empty() {
        println!("Nothing to run.");
        return;
    }

    println!("{:<16} {:<6} {:<8} {}", "TARGET", "INDEX", "STATUS", "DESCRIPTION");
    println!("{}", "-".repeat(70));
    for (target, outcomes) in &report.targets {
        for outcome in outcomes {
            let status = match outcome.error() {
                None => "ok".to_string(),
                Some(e) => format!("rc={}", e.return_code),
            };
            println!(
                "{:<16} {:<6} {:<8} {}",
                target, outcome.index, status, outcome.description
            );
        }
    }
    for target in &report.aborted {
        println!("{:<16} {:<6} {:<8}", target, "-", "aborted");
    }

    let elapsed: chrono::Duration = report.finished_at - report.started_at;
    println!(
        "\nRun {}: {} commands, {} failed, {:.1}s",
        report.run_id,
        report.command_count(),
        report.failures().len(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    for (target, outcome) in report.failures() {
        if let Some(e) = outcome.error() {
            println!("  ❌ {} #{}: {}", target, outcome.index, e.stderr);
        }
    }
}
