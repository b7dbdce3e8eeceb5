use std::sync::Arc;

use clap::Args;
use screenbank_core::{Config, EarningController, RecordingShield, WorkoutEvent};

use super::{open_bank, print_events, CmdResult};

#[derive(Args)]
pub struct EarnArgs {
    /// Workout length in minutes
    minutes: f64,
    /// Workout identifier; a repeated identifier is credited once
    #[arg(long)]
    id: Option<String>,
    /// Workout kind, recorded as the transaction source
    #[arg(long, default_value = "Workout")]
    kind: String,
}

pub fn run(args: EarnArgs) -> CmdResult {
    let config = Config::load()?;
    let bank = open_bank(&config)?;
    let mut earning = EarningController::new(bank, Arc::new(RecordingShield::new()), &config.earning);

    let events = match args.id {
        Some(id) => earning.credit_workout(&WorkoutEvent::new(id, args.minutes * 60.0, args.kind)),
        None => {
            let difficulty = earning.bank().difficulty();
            earning.on_workout_completed(args.minutes, difficulty, &args.kind)
        }
    };
    print_events(&events)
}
