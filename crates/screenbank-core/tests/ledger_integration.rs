//! Integration tests for the ledger across the two host processes.
//!
//! "Processes" are separate controllers, each with its own `Bank`, sharing
//! only a store: either clones of one `MemoryStore` or two connections to
//! the same SQLite file.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use screenbank_core::diagnostics::DiagnosticEvent;
use screenbank_core::storage::{DiagnosticsConfig, EarningConfig, LedgerConfig, TrackingConfig};
use screenbank_core::{
    calculate_deduction, Bank, DiagnosticLog, DifficultyLevel, EarningController, Event,
    LedgerStore, ManualClock, MemoryStore, RecordingShield, SettingsController, SqliteStore,
    StoreKey, UsageTracker, WorkoutEvent,
};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
    ))
}

fn ledger_config(difficulty: DifficultyLevel) -> LedgerConfig {
    LedgerConfig {
        default_difficulty: difficulty,
        ..LedgerConfig::default()
    }
}

fn quiet_log(dir: &tempfile::TempDir) -> DiagnosticLog {
    DiagnosticLog::at(
        dir.path().join("diagnostics.jsonl"),
        &DiagnosticsConfig {
            max_entries: 500,
            rotation_probability: 0.0,
        },
    )
}

#[test]
fn scenario_deductions() {
    let a = calculate_deduction(5, 2, 10);
    assert_eq!((a.to_deduct, a.new_balance, a.should_skip, a.new_minutes_used), (3, 7, false, 3));

    let b = calculate_deduction(3, 3, 10);
    assert_eq!((b.to_deduct, b.new_balance, b.should_skip, b.new_minutes_used), (0, 10, true, 0));

    let c = calculate_deduction(10, 0, 5);
    assert_eq!((c.to_deduct, c.new_balance, c.should_skip, c.new_minutes_used), (5, 0, false, 10));
}

#[test]
fn scenario_earning_and_difficulty() {
    // D: 30 workout minutes at Easy from 50 -> 110.
    let store = MemoryStore::new();
    store.set(StoreKey::Balance, "50").unwrap();
    let bank = Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Easy)).unwrap();
    let mut earning = EarningController::new(bank, Arc::new(RecordingShield::new()), &EarningConfig::default());
    earning.on_workout_completed(30.0, DifficultyLevel::Easy, "Run");
    assert_eq!(earning.bank().balance(), 110);

    // E: Medium from 170 credits only 10, then nothing at the cap.
    let store = MemoryStore::new();
    store.set(StoreKey::Balance, "170").unwrap();
    let bank = Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Medium)).unwrap();
    let mut earning = EarningController::new(bank, Arc::new(RecordingShield::new()), &EarningConfig::default());
    earning.on_workout_completed(30.0, DifficultyLevel::Medium, "Run");
    assert_eq!(earning.bank().balance(), 180);
    assert_eq!(earning.bank().transactions().len(), 1);
    assert_eq!(earning.bank().transactions()[0].amount, 10);
    earning.on_workout_completed(30.0, DifficultyLevel::Medium, "Run");
    assert_eq!(earning.bank().transactions().len(), 1);

    // F: Easy 200 -> Hard clamps to 120; the loss is reported.
    let store = MemoryStore::new();
    store.set(StoreKey::Balance, "200").unwrap();
    let bank = Bank::open(store, clock(), ledger_config(DifficultyLevel::Easy)).unwrap();
    let mut settings = SettingsController::new(bank, Arc::new(RecordingShield::new()));
    let (change, _) = settings.set_difficulty(DifficultyLevel::Hard);
    assert_eq!(change.balance, 120);
    assert_eq!(change.minutes_lost, 80);
}

#[test]
fn monitor_and_app_share_a_sqlite_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let clock = clock();
    let shield = Arc::new(RecordingShield::new());

    let background = Bank::open(
        SqliteStore::open_at(&path).unwrap(),
        clock.clone(),
        ledger_config(DifficultyLevel::Hard),
    )
    .unwrap();
    let mut tracker = UsageTracker::new(
        background,
        quiet_log(&dir),
        shield.clone(),
        &TrackingConfig::default(),
    );

    let foreground = Bank::open(
        SqliteStore::open_at(&path).unwrap(),
        clock.clone(),
        ledger_config(DifficultyLevel::Hard),
    )
    .unwrap();
    let mut earning = EarningController::new(foreground, shield.clone(), &EarningConfig::default());

    tracker.on_interval_start();
    for minute in 1..=30 {
        clock.advance(Duration::minutes(1));
        tracker.on_threshold_event(&format!("minute_{minute}"));
    }
    assert_eq!(tracker.bank().balance(), 0);
    assert_eq!(shield.last(), Some(true));

    // The app sees the exhausted balance and credits a 40 minute run at 2:1.
    earning.credit_workout(&WorkoutEvent::new("run-1", 40.0 * 60.0, "running"));
    assert_eq!(earning.bank().balance(), 20);
    assert_eq!(shield.last(), Some(false));

    // The monitor re-reads before deducting: usage continues from minute 30.
    clock.advance(Duration::minutes(5));
    tracker.on_threshold_event("minute_35");
    assert_eq!(tracker.bank().balance(), 15);

    let spent: i64 = tracker
        .bank()
        .transactions()
        .iter()
        .filter(|t| !t.is_earned())
        .map(|t| t.amount)
        .sum();
    assert_eq!(spent, -35);
}

#[test]
fn redelivered_thresholds_do_not_double_charge() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let bank = Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Medium)).unwrap();
    let log = quiet_log(&dir);
    let mut tracker = UsageTracker::new(
        bank,
        log.clone(),
        Arc::new(RecordingShield::new()),
        &TrackingConfig::default(),
    );

    tracker.on_interval_start();
    for label in ["minute_1", "minute_2", "minute_2", "minute_1", "minute_3", "minute_3"] {
        tracker.on_threshold_event(label);
    }
    assert_eq!(tracker.bank().balance(), 57);
    assert_eq!(tracker.bank().transactions().len(), 3);

    // A second monitor instance (a relaunched extension) replays the same signal.
    let relaunched = Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Medium)).unwrap();
    let mut relaunched = UsageTracker::new(
        relaunched,
        log.clone(),
        Arc::new(RecordingShield::new()),
        &TrackingConfig::default(),
    );
    let events = relaunched.on_threshold_event("minute_3");
    assert!(matches!(events[0], Event::ThresholdSkipped { .. }));
    assert_eq!(relaunched.bank().balance(), 57);

    let kinds: Vec<_> = log.recent(None).unwrap().iter().map(|e| e.event).collect();
    assert_eq!(kinds.iter().filter(|k| **k == DiagnosticEvent::Skip).count(), 4);
    assert_eq!(kinds.iter().filter(|k| **k == DiagnosticEvent::Threshold).count(), 3);
}

#[test]
fn crash_before_commit_loses_only_uncommitted_work() {
    let store = MemoryStore::new();
    {
        let mut bank = Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Medium)).unwrap();
        bank.debit(10, "Screen time");
        bank.commit_balance().unwrap();
        bank.debit(5, "Screen time");
        // Process dies here.
    }
    let bank = Bank::open(store, clock(), ledger_config(DifficultyLevel::Medium)).unwrap();
    assert_eq!(bank.balance(), 50);
    assert_eq!(bank.transactions().len(), 1);
}

#[test]
fn interleaved_read_modify_write_can_lose_an_update() {
    // Documented limitation: no cross-process lock, so a stale view wins.
    let store = MemoryStore::new();
    let mut background = Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Medium)).unwrap();
    let mut foreground = Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Medium)).unwrap();

    foreground.credit(20, "Run");
    background.debit(5, "Screen time");
    foreground.commit_balance().unwrap();
    background.commit_balance().unwrap();

    let observed = Bank::open(store, clock(), ledger_config(DifficultyLevel::Medium)).unwrap();
    assert_eq!(observed.balance(), 55);
}

#[test]
fn settings_changes_are_seen_by_the_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let shield = Arc::new(RecordingShield::new());

    let mut settings = SettingsController::new(
        Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Easy)).unwrap(),
        shield.clone(),
    );
    settings
        .set_selection(screenbank_core::AppSelection {
            applications: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        })
        .unwrap();
    settings.set_difficulty(DifficultyLevel::Extreme);

    let mut tracker = UsageTracker::new(
        Bank::open(store.clone(), clock(), ledger_config(DifficultyLevel::Easy)).unwrap(),
        quiet_log(&dir),
        shield,
        &TrackingConfig::default(),
    );
    tracker.on_interval_start();
    tracker.on_threshold_event("minute_7");

    assert_eq!(tracker.bank().difficulty(), DifficultyLevel::Extreme);
    assert_eq!(tracker.bank().balance(), 53);
    assert_eq!(tracker.bank().transactions()[0].source, "Screen time: 3 apps");
}
