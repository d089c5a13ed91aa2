//! Terminal rendering

use chrono::{DateTime, Utc};
use cloudnuke_core::{
    AggregatedResult, Inventory, InventoryEntry, NukeReporter, Outcome, ReportEntry, TypeFailure,
};
use colored::Colorize;

/// Prints every outcome as it arrives
pub struct ConsoleReporter;

impl NukeReporter for ConsoleReporter {
    fn outcome(&self, entry: &ReportEntry) {
        match entry.outcome {
            Outcome::Deleted => println!(
                "  {} {} {} {}",
                "✓".green(),
                entry.resource_type.cyan(),
                entry.region.dimmed(),
                entry.identifier
            ),
            Outcome::AlreadyGone => println!(
                "  {} {} {} {} {}",
                "✓".green(),
                entry.resource_type.cyan(),
                entry.region.dimmed(),
                entry.identifier,
                "(already gone)".dimmed()
            ),
            Outcome::Failed => println!(
                "  {} {} {} {}: {}",
                "✗".red(),
                entry.resource_type.cyan(),
                entry.region.dimmed(),
                entry.identifier,
                entry.error.as_deref().unwrap_or_default().red()
            ),
        }
    }

    fn type_failure(&self, failure: &TypeFailure) {
        println!(
            "  {} {} {}: {}",
            "⚠".yellow(),
            failure.resource_type.cyan(),
            failure.region.dimmed(),
            failure.message.yellow()
        );
    }

    fn flush(&self, result: &AggregatedResult) {
        println!();
        let summary = result.summary().to_string();
        if result.is_success() {
            println!("{}", summary.green().bold());
        } else {
            println!("{}", summary.red().bold());
        }
    }
}

/// Inventory as an aligned table
pub fn inventory_table(inventory: &Inventory, now: DateTime<Utc>, eligible_only: bool) {
    let rows: Vec<&InventoryEntry> = inventory
        .entries
        .iter()
        .filter(|e| !eligible_only || e.eligible)
        .collect();

    if rows.is_empty() {
        println!("{}", "No resources found".dimmed());
    } else {
        let width = |f: fn(&InventoryEntry) -> usize, header: &str| {
            rows.iter().map(|e| f(e)).max().unwrap_or(0).max(header.len())
        };
        let type_w = width(|e| e.resource_type.len(), "TYPE");
        let region_w = width(|e| e.region.len(), "REGION");
        let id_w = width(|e| e.identifier.len(), "IDENTIFIER");

        println!(
            "{:<type_w$}  {:<region_w$}  {:<id_w$}  {:>6}  {}",
            "TYPE".bold(),
            "REGION".bold(),
            "IDENTIFIER".bold(),
            "AGE".bold(),
            "STATUS".bold()
        );
        for entry in rows {
            let status = match entry.reason {
                None => "nuke".red().bold(),
                Some(reason) => reason.to_string().dimmed(),
            };
            println!(
                "{:<type_w$}  {:<region_w$}  {:<id_w$}  {:>6}  {}",
                entry.resource_type.cyan(),
                entry.region,
                entry.identifier,
                format_age(entry.created_at, now),
                status
            );
        }
    }

    for failure in &inventory.type_failures {
        println!(
            "{} {} {}: {}",
            "⚠".yellow(),
            failure.resource_type.cyan(),
            failure.region.dimmed(),
            failure.message.yellow()
        );
    }
}

/// Short age such as `3d`, `5h`, `12m`; `-` when unknown
pub fn format_age(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created_at) = created_at else {
        return "-".to_string();
    };
    let age = now.signed_duration_since(created_at);
    if age.num_days() > 0 {
        format!("{}d", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{}m", age.num_minutes())
    } else {
        "<1m".to_string()
    }
}

pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
