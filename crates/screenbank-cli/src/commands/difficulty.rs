use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;

use screenbank_core::{Config, CoreError, DifficultyLevel, RecordingShield, SettingsController};

use super::{open_bank, print_events, CmdResult};

#[derive(Subcommand)]
pub enum DifficultyAction {
    /// Show the current level and the table of levels
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Switch level, clamping the balance to the new cap
    Set {
        /// easy, medium, hard or extreme
        level: DifficultyLevel,
        /// Confirm a switch that discards minutes
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: DifficultyAction) -> CmdResult {
    let config = Config::load()?;
    let bank = open_bank(&config)?;
    let mut settings = SettingsController::new(bank, Arc::new(RecordingShield::new()));

    match action {
        DifficultyAction::Show { json } => {
            let current = settings.bank().difficulty();
            if json {
                let levels: Vec<_> = DifficultyLevel::ALL
                    .iter()
                    .map(|level| {
                        json!({
                            "level": level,
                            "max_balance": level.max_balance(),
                            "starting_balance": level.starting_balance(),
                            "workout_minutes_per_screen_minute": level.workout_minutes_per_screen_minute(),
                        })
                    })
                    .collect();
                let out = json!({ "current": current, "levels": levels });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for level in DifficultyLevel::ALL {
                    let marker = if level == current { "*" } else { " " };
                    println!(
                        "{marker} {:<8} {} workout min per screen min, cap {} min",
                        level.label(),
                        level.workout_minutes_per_screen_minute(),
                        level.max_balance()
                    );
                }
            }
        }
        DifficultyAction::Set { level, yes } => {
            let lost = settings.preview_difficulty_change(level)?;
            if lost > 0 && !yes {
                return Err(CoreError::Custom(format!(
                    "switching to {level} discards {lost} minutes; rerun with --yes to confirm"
                )));
            }
            let (_, events) = settings.set_difficulty(level);
            print_events(&events)?;
        }
    }
    Ok(())
}
