//! Liveness heartbeat of the background monitor.
//!
//! The monitor stamps the store on every callback it receives. A diagnostic
//! viewer compares the stamp against now to spot a stalled extension.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::ledger::read_or;
use crate::storage::{set_json, LedgerStore, StoreKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HeartbeatStatus {
    Never,
    Fresh { age_secs: i64 },
    Stale { age_secs: i64 },
}

impl HeartbeatStatus {
    pub fn evaluate(
        last_seen: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Self {
        match last_seen {
            None => HeartbeatStatus::Never,
            Some(at) => {
                let age = now - at;
                let age_secs = age.num_seconds().max(0);
                if age > stale_after {
                    HeartbeatStatus::Stale { age_secs }
                } else {
                    HeartbeatStatus::Fresh { age_secs }
                }
            }
        }
    }

    pub fn is_stale(self) -> bool {
        !matches!(self, HeartbeatStatus::Fresh { .. })
    }
}

pub fn record(store: &dyn LedgerStore, at: DateTime<Utc>) -> Result<(), StoreError> {
    set_json(store, StoreKey::Heartbeat, &at)?;
    store.flush()
}

pub fn last_seen(store: &dyn LedgerStore) -> Result<Option<DateTime<Utc>>, StoreError> {
    read_or(store, StoreKey::Heartbeat, None)
}
