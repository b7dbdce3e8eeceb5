//! Foreground-owned ledger settings: difficulty, app selection, monitoring.

use std::sync::Arc;

use crate::difficulty::DifficultyLevel;
use crate::error::StoreError;
use crate::events::Event;
use crate::ledger::{AppSelection, Bank, DifficultyChange};
use crate::shield::{should_block, Shield};
use crate::storage::LedgerStore;

pub struct SettingsController<S: LedgerStore> {
    bank: Bank<S>,
    shield: Arc<dyn Shield>,
}

impl<S: LedgerStore> SettingsController<S> {
    pub fn new(bank: Bank<S>, shield: Arc<dyn Shield>) -> Self {
        Self { bank, shield }
    }

    pub fn bank(&self) -> &Bank<S> {
        &self.bank
    }

    /// Minutes a switch to `to` would cost, for confirmation before committing.
    pub fn preview_difficulty_change(&mut self, to: DifficultyLevel) -> Result<u32, StoreError> {
        self.bank.reload()?;
        Ok(self.bank.preview_difficulty_change(to))
    }

    /// Switch difficulty, clamping the balance to the new cap.
    ///
    /// Clamped minutes are reported, not recorded as a transaction.
    pub fn set_difficulty(&mut self, to: DifficultyLevel) -> (DifficultyChange, Vec<Event>) {
        let now = self.bank.clock().now();
        if let Err(e) = self.bank.reload() {
            tracing::warn!(error = %e, "changing difficulty on last known ledger");
        }

        let change = self.bank.set_difficulty(to);
        if let Err(e) = self.bank.commit_difficulty() {
            tracing::warn!(error = %e, "difficulty change not fully persisted");
        }
        tracing::info!(
            from = %change.from,
            to = %change.to,
            minutes_lost = change.minutes_lost,
            balance = change.balance,
            "difficulty changed"
        );

        let mut events = vec![Event::DifficultyChanged {
            from: change.from,
            to: change.to,
            minutes_lost: change.minutes_lost,
            balance: change.balance,
            at: now,
        }];
        if should_block(change.balance) {
            self.shield.set_blocked(true);
            events.push(Event::ShieldChanged {
                blocked: true,
                at: now,
            });
        }
        (change, events)
    }

    pub fn set_selection(&mut self, selection: AppSelection) -> Result<(), StoreError> {
        self.bank.set_selection(selection);
        self.bank.commit_selection()
    }

    pub fn set_monitoring_active(&mut self, active: bool) -> Result<(), StoreError> {
        self.bank.set_monitoring_active(active);
        self.bank.commit_monitoring()
    }
}
