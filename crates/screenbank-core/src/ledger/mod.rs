//! Ledger (bank) state.
//!
//! `Bank` is a process-local materialization of the shared store. It must be
//! reloaded before every independent operation and committed (write + flush)
//! after every mutation; nothing is cached across operations.
//!
//! Write partition between the two processes:
//!
//! ```text
//! background monitor : balance (spend), transactions (spend), usage, shield, heartbeat
//! foreground app     : balance (earn), transactions (earn), difficulty, selection,
//!                      monitoring flag, processed workouts, health access
//! ```
//!
//! The partition narrows the lost-update window but does not close it.

mod selection;
mod transaction;

pub use selection::AppSelection;
pub use transaction::{prune_older_than, Transaction};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::difficulty::DifficultyLevel;
use crate::error::StoreError;
use crate::shield::should_block;
use crate::storage::{get_json, set_json, LedgerConfig, LedgerStore, StoreKey};

/// Balance, difficulty and recent transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub balance: u32,
    pub difficulty: DifficultyLevel,
    pub transactions: Vec<Transaction>,
}

impl LedgerState {
    pub fn fresh(difficulty: DifficultyLevel) -> Self {
        Self {
            balance: difficulty.starting_balance(),
            difficulty,
            transactions: Vec::new(),
        }
    }
}

/// Result of a difficulty change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyChange {
    pub from: DifficultyLevel,
    pub to: DifficultyLevel,
    /// Balance removed by clamping to the new cap. Not recorded as a transaction.
    pub minutes_lost: u32,
    pub balance: u32,
}

pub struct Bank<S: LedgerStore> {
    store: S,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    state: LedgerState,
    selection: AppSelection,
    monitoring_active: bool,
}

impl<S: LedgerStore> Bank<S> {
    /// Materialize the ledger from the store.
    ///
    /// A store holding nothing yields a fresh ledger at the configured
    /// default difficulty and its starting balance.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn open(store: S, clock: Arc<dyn Clock>, config: LedgerConfig) -> Result<Self, StoreError> {
        let mut bank = Self {
            store,
            clock,
            state: LedgerState::fresh(config.default_difficulty),
            config,
            selection: AppSelection::default(),
            monitoring_active: false,
        };
        bank.reload()?;
        Ok(bank)
    }

    /// Re-read every ledger field from the store.
    ///
    /// On error the in-memory state is left as it was.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let store: &dyn LedgerStore = &self.store;
        let difficulty: DifficultyLevel =
            read_or(store, StoreKey::Difficulty, self.config.default_difficulty)?;
        let balance: u32 = read_or(store, StoreKey::Balance, difficulty.starting_balance())?;
        let transactions: Vec<Transaction> = read_or(store, StoreKey::Transactions, Vec::new())?;
        let selection: AppSelection = read_or(store, StoreKey::Selection, AppSelection::default())?;
        let monitoring_active: bool = read_or(store, StoreKey::MonitoringActive, false)?;

        self.state = LedgerState {
            balance: balance.min(difficulty.max_balance()),
            difficulty,
            transactions,
        };
        self.selection = selection;
        self.monitoring_active = monitoring_active;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn balance(&self) -> u32 {
        self.state.balance
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.state.difficulty
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.state.transactions
    }

    pub fn selection(&self) -> &AppSelection {
        &self.selection
    }

    pub fn monitoring_active(&self) -> bool {
        self.monitoring_active
    }

    /// The shield should be up.
    pub fn is_exhausted(&self) -> bool {
        should_block(self.state.balance)
    }

    pub fn snapshot(&self) -> LedgerState {
        self.state.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Minutes a switch to `to` would clamp away.
    pub fn preview_difficulty_change(&self, to: DifficultyLevel) -> u32 {
        self.state.balance.saturating_sub(to.max_balance())
    }

    // ── Mutations (in memory; follow with a commit) ──────────────────

    /// Take up to `minutes` off the balance. Returns what was actually deducted.
    pub fn debit(&mut self, minutes: u32, source: &str) -> u32 {
        let deducted = minutes.min(self.state.balance);
        if deducted > 0 {
            self.state.balance -= deducted;
            let tx = Transaction::spent(deducted, source, self.clock.now());
            self.state.transactions.push(tx);
        }
        deducted
    }

    /// Add up to `minutes`, clamped to the difficulty cap. Returns what was
    /// actually credited; nothing is recorded when the cap absorbs it all.
    pub fn credit(&mut self, minutes: u32, source: &str) -> u32 {
        self.credit_up_to(minutes, self.state.difficulty.max_balance(), source)
    }

    /// Like [`Bank::credit`] with an extra ceiling. The difficulty cap still applies.
    pub fn credit_up_to(&mut self, minutes: u32, ceiling: u32, source: &str) -> u32 {
        let cap = ceiling.min(self.state.difficulty.max_balance());
        let new_balance = self.state.balance.saturating_add(minutes).min(cap);
        let credited = new_balance.saturating_sub(self.state.balance);
        if credited > 0 {
            self.state.balance = new_balance;
            let tx = Transaction::earned(credited, source, self.clock.now());
            self.state.transactions.push(tx);
        }
        credited
    }

    pub fn set_difficulty(&mut self, to: DifficultyLevel) -> DifficultyChange {
        let from = self.state.difficulty;
        let minutes_lost = self.preview_difficulty_change(to);
        self.state.difficulty = to;
        self.state.balance -= minutes_lost;
        DifficultyChange {
            from,
            to,
            minutes_lost,
            balance: self.state.balance,
        }
    }

    pub fn set_selection(&mut self, selection: AppSelection) {
        self.selection = selection;
    }

    pub fn set_monitoring_active(&mut self, active: bool) {
        self.monitoring_active = active;
    }

    // ── Commits ──────────────────────────────────────────────────────

    /// Persist balance and transactions (pruned to the retention window).
    pub fn commit_balance(&mut self) -> Result<(), StoreError> {
        self.prune();
        set_json(&self.store, StoreKey::Balance, &self.state.balance)?;
        set_json(&self.store, StoreKey::Transactions, &self.state.transactions)?;
        self.store.flush()
    }

    /// Persist difficulty and the reclamped balance.
    pub fn commit_difficulty(&mut self) -> Result<(), StoreError> {
        set_json(&self.store, StoreKey::Difficulty, &self.state.difficulty)?;
        set_json(&self.store, StoreKey::Balance, &self.state.balance)?;
        self.store.flush()
    }

    pub fn commit_selection(&mut self) -> Result<(), StoreError> {
        set_json(&self.store, StoreKey::Selection, &self.selection)?;
        self.store.flush()
    }

    pub fn commit_monitoring(&mut self) -> Result<(), StoreError> {
        set_json(&self.store, StoreKey::MonitoringActive, &self.monitoring_active)?;
        self.store.flush()
    }

    /// The store holds the in-memory balance. After a partly failed commit
    /// this tells whether the balance write itself landed.
    pub fn balance_persisted(&self) -> bool {
        matches!(get_json::<u32>(&self.store, StoreKey::Balance), Ok(Some(stored)) if stored == self.state.balance)
    }

    fn prune(&mut self) {
        let removed = prune_older_than(
            &mut self.state.transactions,
            self.clock.now(),
            self.config.transaction_retention_days,
        );
        if removed > 0 {
            tracing::debug!(removed, "pruned transactions past retention window");
        }
    }
}

/// Read a field, substituting `fallback` when it is absent or undecodable.
pub(crate) fn read_or<T: DeserializeOwned>(
    store: &dyn LedgerStore,
    key: StoreKey,
    fallback: T,
) -> Result<T, StoreError> {
    match get_json(store, key) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(fallback),
        Err(StoreError::Corrupt { key, message }) => {
            tracing::warn!(%key, %message, "ignoring undecodable ledger field");
            Ok(fallback)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap(),
        ))
    }

    fn bank_with(store: MemoryStore, difficulty: DifficultyLevel) -> Bank<MemoryStore> {
        let config = LedgerConfig {
            default_difficulty: difficulty,
            ..LedgerConfig::default()
        };
        Bank::open(store, clock(), config).unwrap()
    }

    #[test]
    fn empty_store_starts_at_starting_balance() {
        for level in DifficultyLevel::ALL {
            let bank = bank_with(MemoryStore::new(), level);
            assert_eq!(bank.balance(), level.starting_balance());
            assert_eq!(bank.difficulty(), level);
            assert!(bank.transactions().is_empty());
        }
    }

    #[test]
    fn stored_balance_above_cap_is_clamped_on_load() {
        let store = MemoryStore::new();
        store.set(StoreKey::Difficulty, "\"hard\"").unwrap();
        store.set(StoreKey::Balance, "500").unwrap();
        let bank = bank_with(store, DifficultyLevel::Medium);
        assert_eq!(bank.balance(), 120);
    }

    #[test]
    fn corrupt_field_falls_back() {
        let store = MemoryStore::new();
        store.set(StoreKey::Transactions, "{{{").unwrap();
        let bank = bank_with(store, DifficultyLevel::Medium);
        assert!(bank.transactions().is_empty());
    }

    #[test]
    fn debit_never_goes_below_zero() {
        let mut bank = bank_with(MemoryStore::new(), DifficultyLevel::Hard);
        assert_eq!(bank.debit(45, "Screen time"), 30);
        assert_eq!(bank.balance(), 0);
        assert!(bank.is_exhausted());
        assert_eq!(bank.debit(5, "Screen time"), 0);
        assert_eq!(bank.transactions().len(), 1);
        assert_eq!(bank.transactions()[0].amount, -30);
    }

    #[test]
    fn credit_at_cap_records_nothing() {
        let store = MemoryStore::new();
        store.set(StoreKey::Balance, "180").unwrap();
        let mut bank = bank_with(store, DifficultyLevel::Medium);
        assert_eq!(bank.credit(30, "Run"), 0);
        assert!(bank.transactions().is_empty());
    }

    #[test]
    fn difficulty_change_reclamps_without_transaction() {
        let store = MemoryStore::new();
        store.set(StoreKey::Balance, "200").unwrap();
        let mut bank = bank_with(store, DifficultyLevel::Easy);
        assert_eq!(bank.preview_difficulty_change(DifficultyLevel::Hard), 80);

        let change = bank.set_difficulty(DifficultyLevel::Hard);
        assert_eq!(change.minutes_lost, 80);
        assert_eq!(change.balance, 120);
        assert_eq!(bank.balance(), 120);
        assert!(bank.transactions().is_empty());
    }

    #[test]
    fn commit_is_visible_after_reload_elsewhere() {
        let store = MemoryStore::new();
        let mut foreground = bank_with(store.clone(), DifficultyLevel::Medium);
        let mut background = bank_with(store.clone(), DifficultyLevel::Medium);

        foreground.credit(20, "Walk");
        foreground.commit_balance().unwrap();
        assert_eq!(background.balance(), 60);

        background.reload().unwrap();
        assert_eq!(background.balance(), 80);
        assert_eq!(background.transactions().len(), 1);
        assert_eq!(store.flush_count(), 1);
    }

    #[test]
    fn commit_prunes_old_transactions() {
        let clock = clock();
        let mut bank = Bank::open(MemoryStore::new(), clock.clone(), LedgerConfig::default()).unwrap();
        bank.debit(5, "Screen time");
        clock.advance(Duration::days(8));
        bank.credit(5, "Run");
        bank.commit_balance().unwrap();
        assert_eq!(bank.transactions().len(), 1);
        assert!(bank.transactions()[0].is_earned());
    }

    #[test]
    fn flush_failure_keeps_written_values() {
        let store = MemoryStore::new();
        let mut bank = bank_with(store.clone(), DifficultyLevel::Medium);
        store.fail_flush(true);
        bank.debit(10, "Screen time");
        assert!(matches!(bank.commit_balance(), Err(StoreError::FlushFailed(_))));
        assert_eq!(store.raw(StoreKey::Balance).as_deref(), Some("50"));
    }

    fn level() -> impl Strategy<Value = DifficultyLevel> {
        prop::sample::select(DifficultyLevel::ALL.to_vec())
    }

    fn bank_holding(difficulty: DifficultyLevel, stored: u32) -> Bank<MemoryStore> {
        let store = MemoryStore::new();
        store.set(StoreKey::Balance, &stored.to_string()).unwrap();
        bank_with(store, difficulty)
    }

    proptest! {
        #[test]
        fn credit_never_lowers_and_never_passes_cap(
            difficulty in level(),
            stored in 0u32..=240,
            minutes in 0u32..500,
        ) {
            let mut bank = bank_holding(difficulty, stored);
            let before = bank.balance();
            prop_assert!(before <= difficulty.max_balance());

            let credited = bank.credit(minutes, "Running");
            let after = bank.balance();
            prop_assert!(after >= before);
            prop_assert_eq!(after, (before + minutes).min(difficulty.max_balance()));
            prop_assert_eq!(credited, after - before);

            let amounts: Vec<i64> = bank.transactions().iter().map(|t| t.amount).collect();
            if credited > 0 {
                prop_assert_eq!(amounts, vec![i64::from(credited)]);
            } else {
                prop_assert!(amounts.is_empty());
            }
        }

        #[test]
        fn difficulty_change_reclamps_balance(
            from in level(),
            to in level(),
            stored in 0u32..=240,
        ) {
            let mut bank = bank_holding(from, stored);
            let before = bank.balance();
            let preview = bank.preview_difficulty_change(to);

            let change = bank.set_difficulty(to);
            prop_assert_eq!(change.minutes_lost, preview);
            prop_assert_eq!(bank.balance(), before.min(to.max_balance()));
            prop_assert_eq!(change.minutes_lost, before - bank.balance());
            prop_assert_eq!(bank.difficulty(), to);
            prop_assert!(bank.transactions().is_empty());
        }
    }
}
