use crate::TargetArgs;
use anyhow::Context;
use chrono::{DateTime, Utc};
use cloudnuke_core::{FilterConfig, Plan, PlanRequest};
use cloudnuke_local::LocalProvider;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Provider and resolved plan for one run
pub struct Session {
    pub provider: LocalProvider,
    pub plan: Plan,
}

/// Load rules, open the inventory and resolve the plan
///
/// Rules are compiled before the inventory is opened so a bad regex never
/// gets as far as listing.
pub async fn prepare(args: &TargetArgs, exclusive: bool) -> anyhow::Result<Session> {
    let (config_path, config) = cloudnuke_config::load(args.config.as_deref())?;
    if let Some(path) = &config_path {
        tracing::info!(path = %path.display(), "Using config file");
    }
    let rules = config.compile()?;

    if !args.inventory.exists() {
        anyhow::bail!("Inventory file not found: {}", args.inventory.display());
    }
    let provider = if exclusive {
        LocalProvider::open(&args.inventory).await
    } else {
        LocalProvider::open_read_only(&args.inventory).await
    }
    .with_context(|| format!("Failed to open {}", args.inventory.display()))?;

    let registry = provider.registry().await;
    let enabled_regions = provider.enabled_regions().await;

    let now = Utc::now();
    let mut filter = FilterConfig::older_than(ago(now, args.older_than)?)
        .with_now(now)
        .with_rules(rules.defaults);
    if let Some(newer_than) = args.newer_than {
        filter = filter.with_include_after(ago(now, newer_than)?);
    }

    let request = PlanRequest {
        regions: args.regions.clone(),
        excluded_regions: args.excluded_regions.clone(),
        resource_types: args.resource_types.clone(),
        excluded_resource_types: args.excluded_resource_types.clone(),
    };
    let plan = Plan::resolve(&registry, &enabled_regions, &request, filter)?
        .with_rules(&registry, rules.per_type)?;

    Ok(Session { provider, plan })
}

fn ago(now: DateTime<Utc>, duration: Duration) -> anyhow::Result<DateTime<Utc>> {
    let duration = chrono::Duration::from_std(duration)
        .with_context(|| format!("Duration out of range: {}", humantime::format_duration(duration)))?;
    now.checked_sub_signed(duration)
        .with_context(|| format!("Duration out of range: {}", duration))
}
