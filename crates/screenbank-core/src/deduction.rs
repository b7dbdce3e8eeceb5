//! Deduction engine.
//!
//! The usage monitor reports a cumulative per-day minute count, not a delta.
//! Replayed and reordered signals are absorbed by requiring strict forward
//! progress of that counter: anything at or below the last processed minute
//! is a skip.

use serde::{Deserialize, Serialize};

/// Outcome of a single deduction calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionResult {
    /// Minutes to take off the balance.
    pub to_deduct: u32,
    /// Balance after the deduction.
    pub new_balance: u32,
    /// The signal was stale or a duplicate.
    pub should_skip: bool,
    /// Minutes of usage this signal accounts for (0 when skipped).
    pub new_minutes_used: u32,
}

/// Convert a cumulative usage signal into a deduction.
///
/// `event_minute == previous_used` counts as stale.
pub fn calculate_deduction(
    event_minute: u32,
    previous_used: u32,
    current_balance: u32,
) -> DeductionResult {
    if event_minute <= previous_used {
        return DeductionResult {
            to_deduct: 0,
            new_balance: current_balance,
            should_skip: true,
            new_minutes_used: 0,
        };
    }

    let new_minutes_used = event_minute - previous_used;
    let to_deduct = new_minutes_used.min(current_balance);
    DeductionResult {
        to_deduct,
        new_balance: current_balance - to_deduct,
        should_skip: false,
        new_minutes_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn forward_progress_deducts_delta() {
        let result = calculate_deduction(5, 2, 10);
        assert_eq!(
            result,
            DeductionResult {
                to_deduct: 3,
                new_balance: 7,
                should_skip: false,
                new_minutes_used: 3,
            }
        );
    }

    #[test]
    fn repeated_minute_is_skipped() {
        let result = calculate_deduction(3, 3, 10);
        assert_eq!(
            result,
            DeductionResult {
                to_deduct: 0,
                new_balance: 10,
                should_skip: true,
                new_minutes_used: 0,
            }
        );
    }

    #[test]
    fn deduction_limited_by_balance() {
        let result = calculate_deduction(10, 0, 5);
        assert_eq!(
            result,
            DeductionResult {
                to_deduct: 5,
                new_balance: 0,
                should_skip: false,
                new_minutes_used: 10,
            }
        );
    }

    #[test]
    fn zero_balance_still_advances_usage() {
        let result = calculate_deduction(4, 1, 0);
        assert!(!result.should_skip);
        assert_eq!(result.to_deduct, 0);
        assert_eq!(result.new_minutes_used, 3);
    }

    proptest! {
        #[test]
        fn stale_signals_never_touch_balance(
            previous in 0u32..2_000,
            back in 0u32..2_000,
            balance in 0u32..500,
        ) {
            let minute = previous.saturating_sub(back);
            let result = calculate_deduction(minute, previous, balance);
            prop_assert!(result.should_skip);
            prop_assert_eq!(result.to_deduct, 0);
            prop_assert_eq!(result.new_balance, balance);
            prop_assert_eq!(result.new_minutes_used, 0);
        }

        #[test]
        fn forward_signals_deduct_bounded_delta(
            previous in 0u32..2_000,
            ahead in 1u32..2_000,
            balance in 0u32..500,
        ) {
            let minute = previous + ahead;
            let result = calculate_deduction(minute, previous, balance);
            prop_assert!(!result.should_skip);
            prop_assert_eq!(result.to_deduct, ahead.min(balance));
            prop_assert_eq!(result.new_balance, balance - result.to_deduct);
            prop_assert_eq!(result.new_minutes_used, ahead);
        }
    }
}
