//! # Screenbank Core Library
//!
//! Accounting core of a screen-time bank: workouts earn minutes, using the
//! selected apps spends them, and an empty balance shields those apps.
//!
//! ## Architecture
//!
//! Two processes share one durable key-value store and nothing else:
//!
//! - **Background monitor**: [`UsageTracker`] turns cumulative per-minute
//!   threshold labels into deductions and decides when to shield.
//! - **Foreground app**: [`EarningController`] credits workouts at most once;
//!   [`SettingsController`] changes difficulty, app selection and monitoring.
//!
//! Both build on [`Bank`], a process-local view of the ledger that is
//! reloaded before and committed (with flush) after every operation.
//!
//! ## Key Components
//!
//! - [`DifficultyLevel`]: conversion ratio, cap and starting balance
//! - [`calculate_deduction`]: pure deduction engine
//! - [`LedgerStore`]: shared store abstraction ([`SqliteStore`], [`MemoryStore`])
//! - [`DiagnosticLog`]: bounded JSON-lines audit trail
//! - [`Config`]: TOML configuration

pub mod clock;
pub mod deduction;
pub mod diagnostics;
pub mod difficulty;
pub mod earning;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod ledger;
pub mod settings;
pub mod shield;
pub mod storage;
pub mod tracking;

pub use clock::{Clock, ManualClock, SystemClock};
pub use deduction::{calculate_deduction, DeductionResult};
pub use diagnostics::{DiagnosticEvent, DiagnosticLog, DiagnosticLogEntry};
pub use difficulty::DifficultyLevel;
pub use earning::{CreditSummary, EarningController, HealthAccess, WorkoutEvent};
pub use error::{ConfigError, CoreError, LabelError, Result, StoreError};
pub use events::Event;
pub use heartbeat::HeartbeatStatus;
pub use ledger::{AppSelection, Bank, DifficultyChange, LedgerState, Transaction};
pub use settings::SettingsController;
pub use shield::{RecordingShield, Shield};
pub use storage::{Config, LedgerStore, MemoryStore, SqliteStore, StoreKey};
pub use tracking::{UsageTracker, UsageTrackingState};
