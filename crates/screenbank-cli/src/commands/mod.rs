//! Subcommands and the plumbing they share.
//!
//! Every invocation opens the on-disk ledger fresh, so two shells running
//! `threshold` and `earn` behave like the monitor and the app.

use std::sync::Arc;

use screenbank_core::{
    Bank, Config, DiagnosticLog, Event, RecordingShield, Result, SqliteStore, SystemClock,
    UsageTracker,
};

pub mod config;
pub mod difficulty;
pub mod earn;
pub mod heartbeat;
pub mod interval;
pub mod log;
pub mod monitoring;
pub mod selection;
pub mod status;
pub mod threshold;

pub type CmdResult = Result<()>;

pub(crate) fn open_bank(config: &Config) -> Result<Bank<SqliteStore>> {
    let store = SqliteStore::open()?;
    Ok(Bank::open(store, Arc::new(SystemClock), config.ledger.clone())?)
}

pub(crate) fn open_tracker(config: &Config) -> Result<UsageTracker<SqliteStore>> {
    let bank = open_bank(config)?;
    let log = DiagnosticLog::open(&config.diagnostics)?;
    Ok(UsageTracker::new(
        bank,
        log,
        Arc::new(RecordingShield::new()),
        &config.tracking,
    ))
}

pub(crate) fn print_events(events: &[Event]) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(events)?);
    Ok(())
}
