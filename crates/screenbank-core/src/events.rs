use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::difficulty::DifficultyLevel;

/// Every ledger state change produces an Event.
/// Hosts forward them to the UI or print them; none carry authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    IntervalStarted {
        balance: u32,
        at: DateTime<Utc>,
    },
    IntervalEnded {
        used_minutes: u32,
        at: DateTime<Utc>,
    },
    BalanceDebited {
        minute: u32,
        previous_used: u32,
        deducted: u32,
        balance: u32,
        at: DateTime<Utc>,
    },
    /// Stale or duplicate usage signal.
    ThresholdSkipped {
        minute: u32,
        previous_used: u32,
        at: DateTime<Utc>,
    },
    /// Usage signal whose label could not be parsed.
    ThresholdRejected {
        label: String,
        reason: String,
        at: DateTime<Utc>,
    },
    BalanceCredited {
        credited: u32,
        balance: u32,
        source: String,
        at: DateTime<Utc>,
    },
    /// Workout already credited, or one that earned nothing.
    WorkoutSkipped {
        identifier: String,
        reason: String,
        at: DateTime<Utc>,
    },
    DifficultyChanged {
        from: DifficultyLevel,
        to: DifficultyLevel,
        minutes_lost: u32,
        balance: u32,
        at: DateTime<Utc>,
    },
    ShieldChanged {
        blocked: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::IntervalStarted { at, .. }
            | Event::IntervalEnded { at, .. }
            | Event::BalanceDebited { at, .. }
            | Event::ThresholdSkipped { at, .. }
            | Event::ThresholdRejected { at, .. }
            | Event::BalanceCredited { at, .. }
            | Event::WorkoutSkipped { at, .. }
            | Event::DifficultyChanged { at, .. }
            | Event::ShieldChanged { at, .. } => *at,
        }
    }
}
