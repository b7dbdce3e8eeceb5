use chrono::Duration;
use serde::Serialize;

use screenbank_core::heartbeat;
use screenbank_core::{Config, DifficultyLevel, HeartbeatStatus, Transaction};

use super::{open_tracker, CmdResult};

#[derive(Serialize)]
struct StatusReport {
    balance: u32,
    max_balance: u32,
    difficulty: DifficultyLevel,
    shield_active: bool,
    monitoring_active: bool,
    used_minutes_today: u32,
    selection: String,
    heartbeat: HeartbeatStatus,
    recent_transactions: Vec<Transaction>,
}

pub fn run(json: bool) -> CmdResult {
    let config = Config::load()?;
    let tracker = open_tracker(&config)?;
    let bank = tracker.bank();
    let now = bank.clock().now();

    let stale_after = Duration::minutes(i64::from(config.tracking.heartbeat_stale_after_minutes));
    let report = StatusReport {
        balance: bank.balance(),
        max_balance: bank.difficulty().max_balance(),
        difficulty: bank.difficulty(),
        shield_active: bank.is_exhausted(),
        monitoring_active: bank.monitoring_active(),
        used_minutes_today: tracker.usage()?.used_minutes_today,
        selection: bank.selection().describe(),
        heartbeat: HeartbeatStatus::evaluate(heartbeat::last_seen(bank.store())?, now, stale_after),
        recent_transactions: bank.transactions().iter().rev().take(10).cloned().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Balance:    {} / {} min", report.balance, report.max_balance);
    println!("Difficulty: {}", report.difficulty.label());
    println!("Used today: {} min", report.used_minutes_today);
    println!("Selection:  {}", report.selection);
    println!(
        "Monitoring: {}{}",
        if report.monitoring_active { "on" } else { "off" },
        if report.shield_active { " (shielded)" } else { "" }
    );
    for tx in &report.recent_transactions {
        println!(
            "  {} {:+} {}",
            tx.timestamp.format("%Y-%m-%d %H:%M"),
            tx.amount,
            tx.source
        );
    }
    Ok(())
}
