//! # Schema Migration Example
//!
//! Moves an in-memory schema catalog between versions using a
//! [`migset::MigrationSet`]:
//!
//! 1. **Ordered upgrades**: `1.0.0 -> 1.1.0 -> 2.0.0 -> 2.1.0`
//! 2. **Downgrades** in reverse order, stopping at the irreversible `2.0.0`
//! 3. **Failure reporting**: `--fail-at` injects a failure and the report
//!    shows where to resume from
//!
//! Run: `cargo run -p migset-example -- --to 2.1`
//! or:  `RUST_LOG=debug cargo run -p migset-example -- --from 2.1 --to 1 --down`

mod catalog;

use std::error::Error;
use std::process;

use clap::Parser;
use log::info;
use migset::{Direction, MigrationConfig};

use crate::catalog::Catalog;

/// migset-demo: move a toy schema between versions.
///
/// The catalog starts empty and is first brought to `--from`, then moved to
/// `--to`.
#[derive(Parser)]
#[command(name = "migset-demo", version, about, long_about = None)]
struct Cli {
    /// Version the schema starts at.
    #[arg(long, default_value = "0")]
    from: String,

    /// Version to move to. Defaults to the latest registered version.
    #[arg(long)]
    to: Option<String>,

    /// Downgrade instead of upgrade.
    #[arg(long)]
    down: bool,

    /// Reject ranges that run the wrong way for the direction.
    #[arg(long)]
    strict: bool,

    /// Print the plan without running it.
    #[arg(long)]
    dry_run: bool,

    /// Make the migration at this label fail on its first run.
    #[arg(long)]
    fail_at: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", report(e.as_ref()));
        process::exit(1);
    }
}

/// `error: <e>` followed by one `caused by:` line per deeper source.
fn report(e: &dyn Error) -> String {
    let mut out = format!("error: {e}\n");
    // The message already ends with its immediate cause.
    let mut source = e.source().and_then(|cause| cause.source());
    while let Some(cause) = source {
        out.push_str(&format!("  caused by: {cause}\n"));
        source = cause.source();
    }
    out
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::new();
    let config = MigrationConfig {
        strict_range: cli.strict,
    };
    let set = catalog::prepare(&catalog, config, &cli.from, cli.fail_at.as_deref())?;
    println!("Schema at {}:\n{catalog}", cli.from);

    let to = match cli.to {
        Some(to) => to,
        None => match set.latest()? {
            Some(latest) => latest.to_string(),
            None => cli.from.clone(),
        },
    };
    let direction = if cli.down {
        Direction::Downgrade
    } else {
        Direction::Upgrade
    };

    let plan = set.plan(direction, &cli.from, &to)?;
    let steps: Vec<&str> = plan.iter().map(|v| v.as_str()).collect();
    println!("Plan: {direction} {} -> {to}: [{}]", cli.from, steps.join(", "));

    if cli.dry_run {
        return Ok(());
    }

    if let Err(e) = set.execute(&plan) {
        if let Some(failure) = e.as_migration() {
            let resume = failure.resume_from().map_or(cli.from.as_str(), |v| v.as_str());
            println!("\nSchema after partial {direction}:\n{catalog}");
            println!("Resume with: --from {resume} --to {to}");
        }
        return Err(e.into());
    }

    info!("{direction} complete");
    println!("\nSchema at {to}:\n{catalog}");
    Ok(())
}
