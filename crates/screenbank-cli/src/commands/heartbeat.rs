use chrono::{Duration, Utc};
use serde_json::json;

use screenbank_core::heartbeat::last_seen;
use screenbank_core::{Config, HeartbeatStatus};

use super::{open_bank, CmdResult};

pub fn run(json: bool) -> CmdResult {
    let config = Config::load()?;
    let bank = open_bank(&config)?;

    let last = last_seen(bank.store())?;
    let stale_after = Duration::minutes(i64::from(config.tracking.heartbeat_stale_after_minutes));
    let status = HeartbeatStatus::evaluate(last, Utc::now(), stale_after);

    if json {
        let out = json!({ "last_seen": last, "heartbeat": status });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match status {
        HeartbeatStatus::Never => println!("monitor has never reported"),
        HeartbeatStatus::Fresh { age_secs } => println!("monitor alive ({age_secs}s ago)"),
        HeartbeatStatus::Stale { age_secs } => println!("monitor stale ({age_secs}s ago)"),
    }
    Ok(())
}
