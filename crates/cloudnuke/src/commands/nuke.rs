use crate::{OutputFormat, TargetArgs, render, setup};
use cloudnuke_core::{Engine, ExclusionReason, LogReporter, NukeReporter};
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;

/// Word the operator must type to proceed
const CONFIRMATION_WORD: &str = "nuke";

pub async fn handle(
    target: &TargetArgs,
    output: OutputFormat,
    force: bool,
    dry_run: bool,
) -> anyhow::Result<bool> {
    let session = setup::prepare(target, !dry_run).await?;
    let plan = &session.plan;
    let text = output == OutputFormat::Text;

    if text {
        println!("{} {}", "Planning".blue(), plan.summary());
        println!();
    }

    // Read-only pass so the operator sees exactly what is at stake
    let inventory = Engine::new(Arc::new(LogReporter)).inspect(plan).await;
    let eligible = inventory.eligible().count();
    let pending_first_seen = inventory
        .entries
        .iter()
        .any(|e| e.reason == Some(ExclusionReason::FirstSeenPending));

    if dry_run {
        match output {
            OutputFormat::Json => render::json(&inventory)?,
            OutputFormat::Text => {
                render::inventory_table(&inventory, plan.filter.now, true);
                println!();
                println!(
                    "{}",
                    format!("Dry run: {} resources would be nuked", eligible).yellow()
                );
            }
        }
        return Ok(inventory.type_failures.is_empty());
    }

    if text {
        render::inventory_table(&inventory, plan.filter.now, true);
        println!();
    }

    if eligible == 0 && !pending_first_seen {
        if text {
            println!("{}", "Nothing to nuke".green());
        }
        session.provider.close().await?;
        return Ok(inventory.type_failures.is_empty());
    }

    if eligible > 0 && !force && !confirm(eligible)? {
        eprintln!("{}", "Aborted".yellow());
        session.provider.close().await?;
        return Ok(true);
    }

    let reporter: Arc<dyn NukeReporter> = match output {
        OutputFormat::Text => Arc::new(render::ConsoleReporter),
        OutputFormat::Json => Arc::new(LogReporter),
    };
    if text && eligible > 0 {
        println!("{}", "Nuking...".red().bold());
    }
    let result = Engine::new(reporter).nuke(plan).await;

    if !text {
        render::json(&result)?;
    }

    session.provider.close().await?;
    Ok(result.is_success())
}

/// Ask for the confirmation word on stdin; the prompt goes to stderr
fn confirm(eligible: usize) -> anyhow::Result<bool> {
    eprint!(
        "{} resources will be deleted. Type '{}' to continue: ",
        eligible.to_string().red().bold(),
        CONFIRMATION_WORD
    );
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == CONFIRMATION_WORD)
}
