//! GLQ staking log replayer.
//!
//! Loads a ledger config and an ordered JSON Lines operation log, replays
//! the log against a fresh ledger over the in-memory token, and prints the
//! resulting ledger layout and replay report as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use glq_core::token::MemoryToken;
use glq_staking::ledger::LedgerSnapshot;
use glq_staking::oplog::{self, ReplayReport};
use glq_staking::{LedgerConfig, StakingEvent, StakingLedger};

#[derive(Parser, Debug)]
#[command(name = "glq-replay", version, about = "Replay a GLQ staking operation log")]
struct Args {
    /// Ledger config (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Operation log (JSON Lines)
    #[arg(long)]
    log: PathBuf,

    /// Include every committed event in the output
    #[arg(long)]
    events: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[derive(Serialize)]
struct Output {
    snapshot: LedgerSnapshot,
    report: ReplayReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<StakingEvent>>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    let config = LedgerConfig::from_json_file(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let entries = oplog::load_log(&args.log)
        .with_context(|| format!("loading operation log {}", args.log.display()))?;
    info!(entries = entries.len(), admin = %config.admin, custody = %config.custody, "replaying");

    let mut ledger = StakingLedger::new(config, MemoryToken::new()).context("creating ledger")?;
    let report = oplog::replay(&mut ledger, &entries);
    for revert in &report.reverted {
        warn!(index = revert.index, error = %revert.error, "entry reverted");
    }

    let events = ledger.drain_events();
    let output = Output {
        snapshot: ledger.snapshot(),
        report,
        events: args.events.then_some(events),
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("serializing output")?;
    println!("{json}");
    Ok(())
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_defaults() {
        let args = Args::parse_from(["glq-replay", "--config", "c.json", "--log", "ops.jsonl"]);
        assert_eq!(args.config, PathBuf::from("c.json"));
        assert_eq!(args.log_level, "info");
        assert_eq!(args.log_format, "text");
        assert!(!args.events);
        assert!(!args.pretty);
    }

    #[test]
    fn args_require_log() {
        assert!(Args::try_parse_from(["glq-replay", "--config", "c.json"]).is_err());
    }
}
