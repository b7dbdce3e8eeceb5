use std::sync::Arc;

use clap::Subcommand;
use screenbank_core::{Config, RecordingShield, SettingsController};

use super::{open_bank, CmdResult};

#[derive(Subcommand)]
pub enum MonitoringAction {
    /// Start monitoring the selected apps
    On,
    /// Stop monitoring
    Off,
}

pub fn run(action: MonitoringAction) -> CmdResult {
    let config = Config::load()?;
    let bank = open_bank(&config)?;
    let mut settings = SettingsController::new(bank, Arc::new(RecordingShield::new()));

    let active = matches!(action, MonitoringAction::On);
    if active && settings.bank().selection().is_empty() {
        tracing::warn!("monitoring enabled with an empty app selection");
    }
    settings.set_monitoring_active(active)?;
    println!("monitoring {}", if active { "on" } else { "off" });
    Ok(())
}
