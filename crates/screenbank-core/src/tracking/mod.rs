//! Usage tracking controller.
//!
//! Runs in the background monitor. The monitor is driven by a daily schedule:
//!
//! ```text
//! Idle --interval start--> Active --interval end--> Idle
//!                           |  ^
//!                           +--+ threshold "minute_<N>"
//! ```
//!
//! Threshold labels carry the cumulative usage of the day, so each one is
//! turned into a deduction by comparing it with the last processed minute.
//! Nothing here returns an error: every failure is logged (tracing and the
//! diagnostic log) and the monitor keeps going.

mod label;
mod state;

pub use label::parse_threshold_label;
pub use state::UsageTrackingState;

use std::sync::Arc;

use crate::deduction::calculate_deduction;
use crate::diagnostics::{DiagnosticEvent, DiagnosticLog, DiagnosticLogEntry};
use crate::error::StoreError;
use crate::events::Event;
use crate::heartbeat;
use crate::ledger::{read_or, Bank};
use crate::shield::{should_block, Shield};
use crate::storage::{set_json, LedgerStore, StoreKey, TrackingConfig};

pub struct UsageTracker<S: LedgerStore> {
    bank: Bank<S>,
    log: DiagnosticLog,
    shield: Arc<dyn Shield>,
    threshold_prefix: String,
}

impl<S: LedgerStore> UsageTracker<S> {
    pub fn new(
        bank: Bank<S>,
        log: DiagnosticLog,
        shield: Arc<dyn Shield>,
        config: &TrackingConfig,
    ) -> Self {
        Self {
            bank,
            log,
            shield,
            threshold_prefix: config.threshold_prefix.clone(),
        }
    }

    pub fn bank(&self) -> &Bank<S> {
        &self.bank
    }

    /// Today's usage counters as currently stored.
    pub fn usage(&self) -> Result<UsageTrackingState, StoreError> {
        self.load_usage()
    }

    // ── Callbacks ────────────────────────────────────────────────────

    /// A new monitoring interval (a new day) began.
    pub fn on_interval_start(&mut self) -> Vec<Event> {
        let now = self.bank.clock().now();
        let today = self.bank.clock().today();
        self.beat();

        if let Err(e) = self.bank.reload() {
            self.report_failure("reload at interval start", &e);
        }

        let usage = UsageTrackingState::new_day(today);
        if let Err(e) = self.save_usage(&usage) {
            self.report_failure("reset usage at interval start", &e);
        }

        let balance = self.bank.balance();
        let blocked = should_block(balance);
        tracing::info!(balance, blocked, %today, "monitoring interval started");
        self.log.record(
            DiagnosticLogEntry::new(DiagnosticEvent::IntervalStart, now)
                .with_current_balance(balance)
                .with_message(format!("usage reset for {today}")),
        );

        let was_blocked = read_or(self.store(), StoreKey::ShieldActive, false).unwrap_or(false);
        let mut events = vec![Event::IntervalStarted { balance, at: now }];
        events.push(self.direct_shield(blocked, blocked && !was_blocked));
        events
    }

    /// The monitoring interval ended. Counters are kept; the next start resets them.
    pub fn on_interval_end(&mut self) -> Vec<Event> {
        let now = self.bank.clock().now();
        self.beat();

        let usage = match self.load_usage() {
            Ok(usage) => usage,
            Err(e) => {
                self.report_failure("read usage at interval end", &e);
                return Vec::new();
            }
        };
        if let Err(e) = self.save_usage(&usage) {
            self.report_failure("persist usage at interval end", &e);
        }

        tracing::info!(used = usage.used_minutes_today, "monitoring interval ended");
        self.log.record(
            DiagnosticLogEntry::new(DiagnosticEvent::IntervalEnd, now)
                .with_previous_used(usage.used_minutes_today)
                .with_current_balance(self.bank.balance()),
        );
        vec![Event::IntervalEnded {
            used_minutes: usage.used_minutes_today,
            at: now,
        }]
    }

    /// Cumulative usage crossed another minute boundary.
    pub fn on_threshold_event(&mut self, label: &str) -> Vec<Event> {
        let now = self.bank.clock().now();
        self.beat();

        let minute = match parse_threshold_label(label, &self.threshold_prefix) {
            Ok(minute) => minute,
            Err(e) => {
                tracing::warn!(label, error = %e, "dropping malformed threshold label");
                self.log.record(
                    DiagnosticLogEntry::new(DiagnosticEvent::Error, now)
                        .with_message(format!("malformed threshold label '{label}'"))
                        .with_error(e.to_string()),
                );
                return vec![Event::ThresholdRejected {
                    label: label.to_string(),
                    reason: e.to_string(),
                    at: now,
                }];
            }
        };

        // Fresh read: the foreground may have credited since the last callback.
        let reloaded = self.bank.reload().and_then(|()| self.load_usage());
        let mut usage = match reloaded {
            Ok(usage) => usage,
            Err(e) => {
                self.report_failure("reload before threshold", &e);
                return Vec::new();
            }
        };

        let previous_used = usage.used_minutes_today;
        let current_balance = self.bank.balance();
        let result = calculate_deduction(minute, previous_used, current_balance);

        if result.should_skip {
            tracing::debug!(minute, previous_used, "skipping stale threshold");
            self.log.record(
                DiagnosticLogEntry::new(DiagnosticEvent::Skip, now)
                    .with_minute(minute)
                    .with_previous_used(previous_used)
                    .with_current_balance(current_balance),
            );
            if let Err(e) = self.save_usage(&usage) {
                self.report_failure("persist usage after skip", &e);
            }
            return vec![Event::ThresholdSkipped {
                minute,
                previous_used,
                at: now,
            }];
        }

        usage.record(minute);
        let source = self.bank.selection().describe();
        let deducted = self.bank.debit(result.to_deduct, &source);
        let balance = self.bank.balance();

        if let Err(e) = self.save_usage(&usage) {
            self.report_failure("persist usage after threshold", &e);
        }
        if let Err(e) = self.bank.commit_balance() {
            self.report_failure("persist balance after threshold", &e);
        }

        tracing::info!(minute, previous_used, deducted, balance, "threshold processed");
        self.log.record(
            DiagnosticLogEntry::new(DiagnosticEvent::Threshold, now)
                .with_minute(minute)
                .with_previous_used(previous_used)
                .with_balances(current_balance, balance)
                .with_deducted(deducted),
        );

        let mut events = vec![Event::BalanceDebited {
            minute,
            previous_used,
            deducted,
            balance,
            at: now,
        }];
        if should_block(balance) {
            // Logged only when this deduction emptied the balance.
            events.push(self.direct_shield(true, !should_block(current_balance)));
        } else {
            self.clear_stale_shield_flag();
        }
        events
    }

    /// Advisory: usage is about to reach the warning threshold.
    pub fn on_threshold_warning(&mut self) {
        self.beat();
    }

    /// Advisory: the interval is about to end.
    pub fn on_interval_will_end(&mut self) {
        self.beat();
    }

    // ── Internals ────────────────────────────────────────────────────

    fn store(&self) -> &dyn LedgerStore {
        self.bank.store()
    }

    fn load_usage(&self) -> Result<UsageTrackingState, StoreError> {
        let today = self.bank.clock().today();
        let stored = read_or(
            self.store(),
            StoreKey::UsageTracking,
            UsageTrackingState::new_day(today),
        )?;
        Ok(stored.for_day(today))
    }

    fn save_usage(&self, usage: &UsageTrackingState) -> Result<(), StoreError> {
        set_json(self.store(), StoreKey::UsageTracking, usage)?;
        self.store().flush()
    }

    /// Send the shield directive and persist it. `newly_applied` adds a
    /// `shield_applied` entry to the log.
    fn direct_shield(&mut self, blocked: bool, newly_applied: bool) -> Event {
        let now = self.bank.clock().now();
        self.shield.set_blocked(blocked);

        let persisted = set_json(self.store(), StoreKey::ShieldActive, &blocked)
            .and_then(|()| self.store().flush());
        if let Err(e) = persisted {
            self.report_failure("persist shield state", &e);
        }

        if newly_applied {
            self.log.record(
                DiagnosticLogEntry::new(DiagnosticEvent::ShieldApplied, now)
                    .with_current_balance(self.bank.balance())
                    .with_message(self.bank.selection().describe()),
            );
        }
        Event::ShieldChanged { blocked, at: now }
    }

    /// The foreground lifts the shield without touching the flag, so a
    /// positive balance seen here resets it.
    fn clear_stale_shield_flag(&self) {
        if !read_or(self.store(), StoreKey::ShieldActive, false).unwrap_or(false) {
            return;
        }
        let cleared = set_json(self.store(), StoreKey::ShieldActive, &false)
            .and_then(|()| self.store().flush());
        if let Err(e) = cleared {
            self.report_failure("clear shield state", &e);
        }
    }

    fn beat(&self) {
        if let Err(e) = heartbeat::record(self.store(), self.bank.clock().now()) {
            tracing::warn!(error = %e, "heartbeat not recorded");
        }
    }

    /// A flush failure only risks durability and is a warning; anything
    /// else means the write may not have happened.
    fn report_failure(&self, context: &str, err: &StoreError) {
        let now = self.bank.clock().now();
        let kind = match err {
            StoreError::FlushFailed(_) => {
                tracing::warn!(context, error = %err, "ledger flush failed");
                DiagnosticEvent::Warning
            }
            _ => {
                tracing::error!(context, error = %err, "ledger store failure");
                DiagnosticEvent::Error
            }
        };
        self.log.record(
            DiagnosticLogEntry::new(kind, now)
                .with_message(context.to_string())
                .with_error(err.to_string()),
        );
    }
}
