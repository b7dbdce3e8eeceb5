use clap::Subcommand;
use screenbank_core::{Config, DiagnosticLog};

use super::CmdResult;

#[derive(Subcommand)]
pub enum LogAction {
    /// Print diagnostic entries, newest first
    Show {
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete all diagnostic entries
    Clear,
}

pub fn run(action: LogAction) -> CmdResult {
    let config = Config::load()?;
    let log = DiagnosticLog::open(&config.diagnostics)?;

    match action {
        LogAction::Show { limit } => {
            let entries = log.recent(limit)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        LogAction::Clear => {
            log.clear()?;
            println!("diagnostic log cleared");
        }
    }
    Ok(())
}
