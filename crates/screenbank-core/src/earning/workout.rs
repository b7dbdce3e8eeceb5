use serde::{Deserialize, Serialize};

/// A completed workout as delivered by the fitness data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEvent {
    pub identifier: String,
    pub duration_seconds: f64,
    /// Activity category, e.g. "running".
    pub kind: String,
}

impl WorkoutEvent {
    pub fn new(identifier: impl Into<String>, duration_seconds: f64, kind: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            duration_seconds,
            kind: kind.into(),
        }
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }
}

/// Identifiers of workouts already credited, oldest first, bounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedWorkouts {
    ids: Vec<String>,
}

impl ProcessedWorkouts {
    pub fn contains(&self, identifier: &str) -> bool {
        self.ids.iter().any(|id| id == identifier)
    }

    /// Remember `identifier`, forgetting the oldest beyond `cap`.
    pub fn insert(&mut self, identifier: &str, cap: usize) {
        if self.contains(identifier) {
            return;
        }
        self.ids.push(identifier.to_string());
        if self.ids.len() > cap {
            let excess = self.ids.len() - cap;
            self.ids.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Minutes of screen time a workout of `duration_minutes` earns at `ratio`
/// screen minutes per workout minute. Partial minutes are dropped.
pub fn earned_minutes(duration_minutes: f64, screen_per_workout: f64) -> u32 {
    if !(duration_minutes > 0.0) {
        return 0;
    }
    // `as` saturates for out-of-range floats.
    (duration_minutes * screen_per_workout).floor() as u32
}
