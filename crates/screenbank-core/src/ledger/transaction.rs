use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single balance movement. Positive amounts were earned, negative spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: i64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(amount: i64, source: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            source: source.into(),
            timestamp,
        }
    }

    pub fn earned(minutes: u32, source: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(i64::from(minutes), source, at)
    }

    pub fn spent(minutes: u32, source: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(-i64::from(minutes), source, at)
    }

    pub fn is_earned(&self) -> bool {
        self.amount > 0
    }
}

/// Drop transactions older than the retention window, keeping order.
pub fn prune_older_than(
    transactions: &mut Vec<Transaction>,
    now: DateTime<Utc>,
    retention_days: u32,
) -> usize {
    let cutoff = now - Duration::days(i64::from(retention_days));
    let before = transactions.len();
    transactions.retain(|tx| tx.timestamp >= cutoff);
    before - transactions.len()
}
