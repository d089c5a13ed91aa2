use crate::{OutputFormat, TargetArgs, render, setup};
use cloudnuke_core::{Engine, LogReporter};
use colored::Colorize;
use std::sync::Arc;

pub async fn handle(target: &TargetArgs, output: OutputFormat) -> anyhow::Result<bool> {
    let session = setup::prepare(target, false).await?;
    let plan = &session.plan;

    if output == OutputFormat::Text {
        println!("{} {}", "Inspecting".blue(), plan.summary());
        println!();
    }

    let inventory = Engine::new(Arc::new(LogReporter)).inspect(plan).await;

    match output {
        OutputFormat::Json => render::json(&inventory)?,
        OutputFormat::Text => {
            render::inventory_table(&inventory, plan.filter.now, false);
            println!();
            println!(
                "{} of {} resources would be nuked",
                inventory.eligible().count().to_string().bold(),
                inventory.entries.len()
            );
        }
    }

    Ok(inventory.type_failures.is_empty())
}
