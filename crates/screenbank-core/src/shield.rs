//! Block-effect collaborator.
//!
//! The core only decides *whether* the configured apps should be shielded;
//! the platform integration decides how.

use std::sync::Mutex;

pub trait Shield: Send + Sync {
    /// `true` applies the shield to the selected apps, `false` clears it.
    fn set_blocked(&self, blocked: bool);
}

/// The directive for a balance: blocked exactly when nothing is left.
pub fn should_block(balance: u32) -> bool {
    balance == 0
}

/// Records every directive it receives.
#[derive(Debug, Default)]
pub struct RecordingShield {
    directives: Mutex<Vec<bool>>,
}

impl RecordingShield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directives(&self) -> Vec<bool> {
        self.directives
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Most recent directive, if any.
    pub fn last(&self) -> Option<bool> {
        self.directives().last().copied()
    }
}

impl Shield for RecordingShield {
    fn set_blocked(&self, blocked: bool) {
        tracing::info!(blocked, "shield directive");
        if let Ok(mut directives) = self.directives.lock() {
            directives.push(blocked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_only_at_zero() {
        assert!(should_block(0));
        assert!(!should_block(1));
    }

    #[test]
    fn recording_shield_keeps_order() {
        let shield = RecordingShield::new();
        shield.set_blocked(true);
        shield.set_blocked(false);
        assert_eq!(shield.directives(), vec![true, false]);
        assert_eq!(shield.last(), Some(false));
    }
}
