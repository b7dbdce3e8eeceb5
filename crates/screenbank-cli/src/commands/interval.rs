use clap::Subcommand;
use screenbank_core::Config;

use super::{open_tracker, print_events, CmdResult};

#[derive(Subcommand)]
pub enum IntervalAction {
    /// A new monitoring interval began; resets today's usage
    Start,
    /// The monitoring interval ended
    End,
    /// Usage is about to hit the warning threshold
    Warning,
    /// The interval is about to end
    WillEnd,
}

pub fn run(action: IntervalAction) -> CmdResult {
    let config = Config::load()?;
    let mut tracker = open_tracker(&config)?;

    let events = match action {
        IntervalAction::Start => tracker.on_interval_start(),
        IntervalAction::End => tracker.on_interval_end(),
        IntervalAction::Warning => {
            tracker.on_threshold_warning();
            Vec::new()
        }
        IntervalAction::WillEnd => {
            tracker.on_interval_will_end();
            Vec::new()
        }
    };
    print_events(&events)
}
