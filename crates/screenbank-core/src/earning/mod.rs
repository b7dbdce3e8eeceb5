//! Earning controller.
//!
//! Runs in the foreground app. Converts completed workouts into balance,
//! crediting each workout identifier at most once.

mod access;
mod workout;

pub use access::HealthAccess;
pub use workout::{earned_minutes, ProcessedWorkouts, WorkoutEvent};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::difficulty::DifficultyLevel;
use crate::error::StoreError;
use crate::events::Event;
use crate::ledger::{read_or, Bank};
use crate::shield::{should_block, Shield};
use crate::storage::{set_json, EarningConfig, LedgerStore, StoreKey};

/// Totals for a batch of workouts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditSummary {
    pub credited_minutes: u32,
    pub credited_workouts: usize,
    pub skipped_workouts: usize,
    pub events: Vec<Event>,
}

pub struct EarningController<S: LedgerStore> {
    bank: Bank<S>,
    shield: Arc<dyn Shield>,
    processed_cap: usize,
}

impl<S: LedgerStore> EarningController<S> {
    pub fn new(bank: Bank<S>, shield: Arc<dyn Shield>, config: &EarningConfig) -> Self {
        Self {
            bank,
            shield,
            processed_cap: config.processed_workout_cap,
        }
    }

    pub fn bank(&self) -> &Bank<S> {
        &self.bank
    }

    /// Credit `duration_minutes` of workout converted at `difficulty`.
    ///
    /// The result is capped at `difficulty`'s maximum. The ledger's own cap
    /// applies as well, since a stored balance above it would be clamped away
    /// on the next load; callers normally pass the ledger difficulty, where
    /// the two caps coincide. When the cap absorbs everything no transaction
    /// is recorded.
    pub fn on_workout_completed(
        &mut self,
        duration_minutes: f64,
        difficulty: DifficultyLevel,
        source: &str,
    ) -> Vec<Event> {
        if !(duration_minutes > 0.0) {
            return Vec::new();
        }
        if let Err(e) = self.bank.reload() {
            tracing::error!(error = %e, "cannot read ledger before crediting workout");
            return Vec::new();
        }
        self.credit(duration_minutes, difficulty, source).1
    }

    /// Credit a workout unless its identifier was already processed.
    pub fn credit_workout(&mut self, workout: &WorkoutEvent) -> Vec<Event> {
        let now = self.bank.clock().now();
        let reloaded = self.bank.reload().and_then(|()| self.processed());
        let mut processed = match reloaded {
            Ok(processed) => processed,
            Err(e) => {
                // Without the processed set a credit could be a repeat.
                tracing::error!(workout = %workout.identifier, error = %e, "cannot read ledger before crediting workout");
                return Vec::new();
            }
        };

        if processed.contains(&workout.identifier) {
            tracing::debug!(workout = %workout.identifier, "workout already credited");
            return vec![Event::WorkoutSkipped {
                identifier: workout.identifier.clone(),
                reason: "already credited".into(),
                at: now,
            }];
        }

        let difficulty = self.bank.difficulty();
        let (outcome, mut events) = self.credit(workout.duration_minutes(), difficulty, &workout.kind);

        // Once the credited balance is in the store the workout counts as
        // credited, even if a later write of the same commit failed. Only a
        // credit that never reached the store stays eligible for retry.
        let landed = match &outcome {
            Ok(()) | Err(StoreError::FlushFailed(_)) => true,
            Err(_) => self.bank.balance_persisted(),
        };
        if !landed {
            return events;
        }

        processed.insert(&workout.identifier, self.processed_cap);
        let saved = set_json(self.bank.store(), StoreKey::ProcessedWorkouts, &processed)
            .and_then(|()| self.bank.store().flush());
        if let Err(e) = saved {
            tracing::warn!(workout = %workout.identifier, error = %e, "processed workout id not persisted");
        }

        if events.is_empty() {
            events.push(Event::WorkoutSkipped {
                identifier: workout.identifier.clone(),
                reason: "nothing to credit".into(),
                at: now,
            });
        }
        events
    }

    /// Credit a batch. An empty batch is not an error.
    pub fn credit_workouts(&mut self, workouts: &[WorkoutEvent]) -> CreditSummary {
        let mut summary = CreditSummary::default();
        for workout in workouts {
            for event in self.credit_workout(workout) {
                match &event {
                    Event::BalanceCredited { credited, .. } => {
                        summary.credited_minutes += credited;
                        summary.credited_workouts += 1;
                    }
                    Event::WorkoutSkipped { .. } => summary.skipped_workouts += 1,
                    _ => {}
                }
                summary.events.push(event);
            }
        }
        summary
    }

    pub fn health_access(&self) -> HealthAccess {
        read_or(self.bank.store(), StoreKey::HealthAccess, HealthAccess::Unknown)
            .unwrap_or_default()
    }

    pub fn set_health_access(&mut self, access: HealthAccess) -> Result<(), StoreError> {
        set_json(self.bank.store(), StoreKey::HealthAccess, &access)?;
        self.bank.store().flush()
    }

    pub fn mark_requested(&mut self) -> Result<(), StoreError> {
        self.set_health_access(HealthAccess::Requested)
    }

    /// Only the user can reverse a denial; nothing here re-requests.
    pub fn mark_denied(&mut self) -> Result<(), StoreError> {
        self.set_health_access(HealthAccess::ConfirmedDenied)
    }

    fn processed(&self) -> Result<ProcessedWorkouts, StoreError> {
        read_or(
            self.bank.store(),
            StoreKey::ProcessedWorkouts,
            ProcessedWorkouts::default(),
        )
    }

    /// Apply a credit to the freshly reloaded ledger and commit it.
    fn credit(
        &mut self,
        duration_minutes: f64,
        difficulty: DifficultyLevel,
        source: &str,
    ) -> (Result<(), StoreError>, Vec<Event>) {
        let now = self.bank.clock().now();
        if difficulty != self.bank.difficulty() {
            tracing::debug!(%difficulty, ledger = %self.bank.difficulty(), "converting at a difficulty other than the ledger's");
        }

        let earned = earned_minutes(duration_minutes, difficulty.screen_minutes_per_workout_minute());
        let previous = self.bank.balance();
        let credited = self.bank.credit_up_to(earned, difficulty.max_balance(), source);
        if credited == 0 {
            tracing::debug!(earned, balance = previous, "credit absorbed by cap");
            return (Ok(()), Vec::new());
        }

        let committed = self.bank.commit_balance();
        if let Err(e) = &committed {
            tracing::warn!(error = %e, credited, "credited balance not fully persisted");
        }

        let balance = self.bank.balance();
        tracing::info!(earned, credited, balance, source, "workout credited");
        let mut events = vec![Event::BalanceCredited {
            credited,
            balance,
            source: source.to_string(),
            at: now,
        }];
        if should_block(previous) && !should_block(balance) {
            self.shield.set_blocked(false);
            events.push(Event::ShieldChanged {
                blocked: false,
                at: now,
            });
        }
        (committed, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::shield::RecordingShield;
    use crate::storage::{LedgerConfig, MemoryStore};
    use chrono::{TimeZone, Utc};

    fn controller(
        store: MemoryStore,
        difficulty: DifficultyLevel,
    ) -> (EarningController<MemoryStore>, Arc<RecordingShield>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 4, 18, 0, 0).unwrap(),
        ));
        let config = LedgerConfig {
            default_difficulty: difficulty,
            ..LedgerConfig::default()
        };
        let bank = Bank::open(store, clock, config).unwrap();
        let shield = Arc::new(RecordingShield::new());
        let controller = EarningController::new(bank, shield.clone(), &EarningConfig::default());
        (controller, shield)
    }

    #[test]
    fn easy_doubles_workout_minutes() {
        let store = MemoryStore::new();
        store.set(StoreKey::Balance, "50").unwrap();
        let (mut earning, _) = controller(store, DifficultyLevel::Easy);

        let events = earning.on_workout_completed(30.0, DifficultyLevel::Easy, "Run");
        assert!(matches!(events[0], Event::BalanceCredited { credited: 60, balance: 110, .. }));
        assert_eq!(earning.bank().transactions()[0].amount, 60);
    }

    #[test]
    fn capped_credit_records_actual_amount() {
        let store = MemoryStore::new();
        store.set(StoreKey::Balance, "170").unwrap();
        let (mut earning, _) = controller(store.clone(), DifficultyLevel::Medium);

        earning.on_workout_completed(30.0, DifficultyLevel::Medium, "Run");
        assert_eq!(earning.bank().balance(), 180);
        assert_eq!(earning.bank().transactions()[0].amount, 10);

        let events = earning.on_workout_completed(30.0, DifficultyLevel::Medium, "Run");
        assert!(events.is_empty());
        assert_eq!(earning.bank().transactions().len(), 1);
    }

    #[test]
    fn conversion_difficulty_cap_applies() {
        let store = MemoryStore::new();
        store.set(StoreKey::Balance, "110").unwrap();
        let (mut earning, _) = controller(store, DifficultyLevel::Medium);

        earning.on_workout_completed(60.0, DifficultyLevel::Hard, "Row");
        assert_eq!(earning.bank().balance(), 120);
        assert_eq!(earning.bank().transactions()[0].amount, 10);
    }

    #[test]
    fn nonpositive_duration_is_noop() {
        let (mut earning, _) = controller(MemoryStore::new(), DifficultyLevel::Medium);
        assert!(earning.on_workout_completed(0.0, DifficultyLevel::Medium, "Run").is_empty());
        assert!(earning.on_workout_completed(-10.0, DifficultyLevel::Medium, "Run").is_empty());
        assert_eq!(earning.bank().balance(), 60);
    }

    #[test]
    fn leaving_zero_lifts_shield() {
        let (mut earning, shield) = controller(MemoryStore::new(), DifficultyLevel::Extreme);
        let events = earning.on_workout_completed(9.0, DifficultyLevel::Extreme, "Swim");
        assert_eq!(earning.bank().balance(), 3);
        assert_eq!(shield.directives(), vec![false]);
        assert!(matches!(events[1], Event::ShieldChanged { blocked: false, .. }));

        earning.on_workout_completed(9.0, DifficultyLevel::Extreme, "Swim");
        assert_eq!(shield.directives(), vec![false]);
    }

    #[test]
    fn workout_identifier_credited_once() {
        let store = MemoryStore::new();
        let (mut earning, _) = controller(store, DifficultyLevel::Medium);
        let workout = WorkoutEvent::new("hk-1", 20.0 * 60.0, "cycling");

        earning.credit_workout(&workout);
        let again = earning.credit_workout(&workout);
        assert!(matches!(again[0], Event::WorkoutSkipped { .. }));
        assert_eq!(earning.bank().balance(), 80);
        assert_eq!(earning.bank().transactions()[0].source, "cycling");
    }

    #[test]
    fn workout_at_cap_is_still_marked_processed() {
        let store = MemoryStore::new();
        store.set(StoreKey::Balance, "180").unwrap();
        let (mut earning, _) = controller(store.clone(), DifficultyLevel::Medium);
        let workout = WorkoutEvent::new("hk-2", 600.0, "walking");

        let events = earning.credit_workout(&workout);
        assert!(matches!(&events[0], Event::WorkoutSkipped { reason, .. } if reason == "nothing to credit"));

        store.set(StoreKey::Balance, "100").unwrap();
        let events = earning.credit_workout(&workout);
        assert!(matches!(&events[0], Event::WorkoutSkipped { reason, .. } if reason == "already credited"));
        assert_eq!(earning.bank().balance(), 100);
    }

    #[test]
    fn failed_write_leaves_workout_retryable() {
        let store = MemoryStore::new();
        let (mut earning, _) = controller(store.clone(), DifficultyLevel::Medium);
        let workout = WorkoutEvent::new("hk-3", 600.0, "yoga");

        store.fail_writes(true);
        earning.credit_workout(&workout);
        store.fail_writes(false);

        let events = earning.credit_workout(&workout);
        assert!(matches!(events[0], Event::BalanceCredited { credited: 10, balance: 70, .. }));
    }

    #[test]
    fn partial_commit_still_marks_workout_credited() {
        let store = MemoryStore::new();
        let (mut earning, _) = controller(store.clone(), DifficultyLevel::Medium);
        let workout = WorkoutEvent::new("hk-4", 600.0, "rowing");

        store.fail_writes_to(StoreKey::Transactions, true);
        earning.credit_workout(&workout);
        assert_eq!(store.raw(StoreKey::Balance).as_deref(), Some("70"));
        store.fail_writes_to(StoreKey::Transactions, false);

        let events = earning.credit_workout(&workout);
        assert!(matches!(&events[0], Event::WorkoutSkipped { reason, .. } if reason == "already credited"));
        assert_eq!(store.raw(StoreKey::Balance).as_deref(), Some("70"));
    }

    #[test]
    fn batch_summary_counts() {
        let (mut earning, _) = controller(MemoryStore::new(), DifficultyLevel::Hard);
        let batch = vec![
            WorkoutEvent::new("a", 1200.0, "running"),
            WorkoutEvent::new("a", 1200.0, "running"),
            WorkoutEvent::new("b", 600.0, "rowing"),
        ];
        let summary = earning.credit_workouts(&batch);
        assert_eq!(summary.credited_workouts, 2);
        assert_eq!(summary.skipped_workouts, 1);
        assert_eq!(summary.credited_minutes, 15);
        assert_eq!(earning.bank().balance(), 45);

        assert_eq!(earning.credit_workouts(&[]), CreditSummary::default());
    }

    #[test]
    fn health_access_persists() {
        let store = MemoryStore::new();
        let (mut earning, _) = controller(store, DifficultyLevel::Medium);
        assert_eq!(earning.health_access(), HealthAccess::Unknown);
        earning.mark_requested().unwrap();
        assert_eq!(earning.health_access(), HealthAccess::Requested);
        earning.mark_denied().unwrap();
        assert_eq!(earning.health_access(), HealthAccess::ConfirmedDenied);

        // Denial does not gate crediting.
        let events = earning.credit_workout(&WorkoutEvent::new("hk-9", 600.0, "walking"));
        assert!(matches!(events[0], Event::BalanceCredited { .. }));
    }
}
