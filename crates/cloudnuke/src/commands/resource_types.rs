use crate::{OutputFormat, render};
use cloudnuke_local::LocalProvider;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct TypeInfo {
    name: String,
    global: bool,
    max_batch_size: usize,
    first_seen: bool,
    confirmed: bool,
    teardown: Vec<String>,
}

pub async fn handle(inventory: &Path, output: OutputFormat) -> anyhow::Result<bool> {
    if !inventory.exists() {
        anyhow::bail!("Inventory file not found: {}", inventory.display());
    }
    let provider = LocalProvider::open_read_only(inventory).await?;
    let registry = provider.registry().await;

    let types: Vec<TypeInfo> = registry
        .iter()
        .map(|t| TypeInfo {
            name: t.name().to_string(),
            global: t.is_global(),
            max_batch_size: t.max_batch_size(),
            first_seen: t.first_seen_store().is_some(),
            confirmed: t.confirmation().is_some(),
            teardown: t
                .teardown_steps()
                .iter()
                .map(|s| s.name().to_string())
                .collect(),
        })
        .collect();

    match output {
        OutputFormat::Json => render::json(&types)?,
        OutputFormat::Text => {
            for info in &types {
                let mut flags = vec![format!("batch {}", info.max_batch_size)];
                if info.global {
                    flags.push("global".to_string());
                }
                if info.first_seen {
                    flags.push("first-seen".to_string());
                }
                if info.confirmed {
                    flags.push("confirmed".to_string());
                }
                println!("{} ({})", info.name.cyan(), flags.join(", ").dimmed());
                if !info.teardown.is_empty() {
                    println!("    teardown: {}", info.teardown.join(" → "));
                }
            }
        }
    }
    Ok(true)
}
