use screenbank_core::Config;

use super::{open_tracker, print_events, CmdResult};

pub fn run(label: &str) -> CmdResult {
    let config = Config::load()?;
    let mut tracker = open_tracker(&config)?;
    print_events(&tracker.on_threshold_event(label))
}
