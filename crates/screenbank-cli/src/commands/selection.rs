use std::sync::Arc;

use clap::Subcommand;
use screenbank_core::{AppSelection, Config, RecordingShield, SettingsController};

use super::{open_bank, CmdResult};

#[derive(Subcommand)]
pub enum SelectionAction {
    /// Replace the monitored selection
    Set {
        /// Application token (repeatable)
        #[arg(long = "app")]
        apps: Vec<String>,
        /// Category token (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Web domain token (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,
    },
    /// Print the monitored selection as JSON
    Show,
}

pub fn run(action: SelectionAction) -> CmdResult {
    let config = Config::load()?;
    let bank = open_bank(&config)?;
    let mut settings = SettingsController::new(bank, Arc::new(RecordingShield::new()));

    match action {
        SelectionAction::Set {
            apps,
            categories,
            domains,
        } => {
            let selection = AppSelection {
                applications: apps,
                categories,
                web_domains: domains,
            };
            let label = selection.describe();
            settings.set_selection(selection)?;
            println!("{label}");
        }
        SelectionAction::Show => {
            println!("{}", serde_json::to_string_pretty(settings.bank().selection())?);
        }
    }
    Ok(())
}
