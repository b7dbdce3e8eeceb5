//! Ledger persistence.
//!
//! The key-value store is the only state shared between the foreground app
//! process and the background monitor. Neither holds a lock across a
//! read-modify-write; each re-reads before computing its delta and ends every
//! mutation with `flush()`.

mod config;
pub mod database;
pub mod memory;

pub use config::{Config, DiagnosticsConfig, EarningConfig, LedgerConfig, TrackingConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::StoreError;

/// Logical fields of the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Balance,
    Difficulty,
    Selection,
    MonitoringActive,
    UsageTracking,
    Transactions,
    ProcessedWorkouts,
    ShieldActive,
    Heartbeat,
    HealthAccess,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Balance => "balance",
            StoreKey::Difficulty => "difficulty",
            StoreKey::Selection => "selection",
            StoreKey::MonitoringActive => "monitoring_active",
            StoreKey::UsageTracking => "usage_tracking",
            StoreKey::Transactions => "transactions",
            StoreKey::ProcessedWorkouts => "processed_workouts",
            StoreKey::ShieldActive => "shield_active",
            StoreKey::Heartbeat => "heartbeat",
            StoreKey::HealthAccess => "health_access",
        }
    }
}

/// Durable key-value store shared across processes.
pub trait LedgerStore: Send + Sync {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError>;

    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError>;

    /// Force previously set values to durable storage.
    fn flush(&self) -> Result<(), StoreError>;
}

impl<T: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<T> {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn flush(&self) -> Result<(), StoreError> {
        (**self).flush()
    }
}

/// Read and decode a JSON-encoded field.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn LedgerStore,
    key: StoreKey,
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.as_str().to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Encode and write a field as JSON.
pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn LedgerStore,
    key: StoreKey,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|e| StoreError::WriteFailed {
        key: key.as_str().to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &raw)
}

/// Returns the data directory.
///
/// `SCREENBANK_DATA_DIR` wins when set; otherwise `~/.config/screenbank[-dev]/`
/// based on SCREENBANK_ENV (set SCREENBANK_ENV=dev for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("SCREENBANK_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("SCREENBANK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("screenbank-dev")
            } else {
                base_dir.join("screenbank")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
