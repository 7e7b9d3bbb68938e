use crate::context::Context;
use swarm_core::Inventory;

pub fn run(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let snapshot = ctx.inventory.snapshot()?;
    if snapshot.targets.is_empty() {
        println!("No targets in inventory.");
        println!("Pass --inventory or set `inventory:` in the config.");
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.targets)?);
    } else {
        println!("{:<20} {:<10} {}", "NAME", "ROLE", "ADDRESS");
        println!("{}", "-".repeat(50));
        for t in &snapshot.targets {
            println!(
                "{:<20} {:<10} {}",
                t.name,
                t.role.as_str(),
                t.address.as_deref().unwrap_or("-"),
            );
        }
    }

    Ok(())
}
