mod commands;
mod render;
mod setup;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cloud-nuke")]
#[command(about = "Find and destroy stale cloud resources", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Report format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete every eligible resource
    Nuke {
        #[command(flatten)]
        target: TargetArgs,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,

        /// List what would be deleted and stop
        #[arg(long)]
        dry_run: bool,
    },
    /// List resources and whether they would be deleted
    Inspect {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// List the resource types the inventory provides
    #[command(name = "resource-types")]
    ResourceTypes {
        /// Inventory file
        #[arg(long, env = "CLOUDNUKE_INVENTORY", default_value = cloudnuke_local::DEFAULT_INVENTORY_PATH)]
        inventory: PathBuf,
    },
    /// Show version information
    Version,
}

/// Selection shared by `nuke` and `inspect`
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Only these regions (repeatable)
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// Skip these regions (repeatable)
    #[arg(long = "exclude-region")]
    pub excluded_regions: Vec<String>,

    /// Only these resource types (repeatable)
    #[arg(long = "resource-type")]
    pub resource_types: Vec<String>,

    /// Skip these resource types (repeatable)
    #[arg(long = "exclude-resource-type")]
    pub excluded_resource_types: Vec<String>,

    /// Only resources older than this (e.g. 24h, 7d)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s")]
    pub older_than: Duration,

    /// Only resources newer than this
    #[arg(long, value_parser = humantime::parse_duration)]
    pub newer_than: Option<Duration>,

    /// Rules file; skips config discovery
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Inventory file
    #[arg(long, env = "CLOUDNUKE_INVENTORY", default_value = cloudnuke_local::DEFAULT_INVENTORY_PATH)]
    pub inventory: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("cloud-nuke {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Logs go to stderr; stdout carries the report
    setup::init_logging(&cli.log_level);

    let success = match cli.command {
        Commands::Nuke {
            target,
            force,
            dry_run,
        } => commands::nuke::handle(&target, cli.output, force, dry_run).await?,
        Commands::Inspect { target } => commands::inspect::handle(&target, cli.output).await?,
        Commands::ResourceTypes { inventory } => {
            commands::resource_types::handle(&inventory, cli.output).await?
        }
        Commands::Version => true,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
