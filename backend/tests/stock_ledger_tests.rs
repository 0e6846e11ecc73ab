//! Stock ledger tests
//!
//! Tests for the append-only movements ledger including:
//! - Balance as the fold of signed quantities
//! - Previous/new balance chain continuity
//! - The oversell guard on outbound legs
//! - Transfer leg planning

use shared::validation::validate_quantity;

// ============================================================================
// Ledger simulation helpers
// ============================================================================

/// One ledger entry as written by an apply
#[derive(Debug, Clone, Copy)]
struct Entry {
    quantity: i64,
    previous_balance: i64,
    new_balance: i64,
}

/// Append an entry, refusing any outbound write that would push the
/// balance negative. Mirrors the guard that runs inside the apply
/// transaction.
fn append(ledger: &mut Vec<Entry>, quantity: i64) -> Result<i64, &'static str> {
    let balance: i64 = ledger.iter().map(|e| e.quantity).sum();
    if quantity < 0 && balance < -quantity {
        return Err("Insufficient stock");
    }
    ledger.push(Entry {
        quantity,
        previous_balance: balance,
        new_balance: balance + quantity,
    });
    Ok(balance + quantity)
}

fn balance(ledger: &[Entry]) -> i64 {
    ledger.iter().map(|e| e.quantity).sum()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test the empty ledger reads zero
    #[test]
    fn test_empty_ledger_zero_balance() {
        assert_eq!(balance(&[]), 0);
    }

    /// Test an IN then an OUT
    #[test]
    fn test_in_then_out() {
        let mut ledger = Vec::new();
        assert_eq!(append(&mut ledger, 100).unwrap(), 100);
        assert_eq!(append(&mut ledger, -10).unwrap(), 90);
        assert_eq!(balance(&ledger), 90);
    }

    /// Test the recorded balance chain of consecutive entries
    #[test]
    fn test_balance_chain() {
        let mut ledger = Vec::new();
        append(&mut ledger, 50).unwrap();
        append(&mut ledger, 30).unwrap();
        append(&mut ledger, -20).unwrap();

        assert_eq!(ledger[0].previous_balance, 0);
        assert_eq!(ledger[0].new_balance, 50);
        assert_eq!(ledger[1].previous_balance, 50);
        assert_eq!(ledger[1].new_balance, 80);
        assert_eq!(ledger[2].previous_balance, 80);
        assert_eq!(ledger[2].new_balance, 60);
    }

    /// Test an outbound write larger than the balance is refused
    #[test]
    fn test_oversell_refused() {
        let mut ledger = Vec::new();
        append(&mut ledger, 50).unwrap();

        assert!(append(&mut ledger, -60).is_err());
        // Refusal leaves the ledger untouched
        assert_eq!(ledger.len(), 1);
        assert_eq!(balance(&ledger), 50);
    }

    /// Test withdrawing the exact balance is allowed
    #[test]
    fn test_exact_withdrawal() {
        let mut ledger = Vec::new();
        append(&mut ledger, 50).unwrap();
        assert_eq!(append(&mut ledger, -50).unwrap(), 0);
    }

    /// Test concurrent withdrawals cannot both succeed past the balance.
    /// With a balance of q and two withdrawals of q each, serialization
    /// means exactly one wins.
    #[test]
    fn test_serialized_withdrawals() {
        let mut ledger = Vec::new();
        append(&mut ledger, 40).unwrap();

        let first = append(&mut ledger, -40);
        let second = append(&mut ledger, -40);

        assert!(first.is_ok());
        assert!(second.is_err());
        assert_eq!(balance(&ledger), 0);
    }

    /// Test a transfer writes one negative and one positive leg that net
    /// to zero across both warehouses
    #[test]
    fn test_transfer_nets_zero() {
        let mut source = Vec::new();
        let mut destination = Vec::new();
        append(&mut source, 100).unwrap();

        append(&mut source, -30).unwrap();
        append(&mut destination, 30).unwrap();

        assert_eq!(balance(&source), 70);
        assert_eq!(balance(&destination), 30);
        assert_eq!(balance(&source) + balance(&destination), 100);
    }

    /// Test requested quantities are validated before any ledger write
    #[test]
    fn test_requested_quantity_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn delta_strategy() -> impl Strategy<Value = i64> {
        -1000i64..1000
    }

    proptest! {
        /// Property: balance equals the fold of accepted quantities
        #[test]
        fn prop_balance_is_fold(deltas in prop::collection::vec(delta_strategy(), 0..50)) {
            let mut ledger = Vec::new();
            for d in deltas {
                let _ = append(&mut ledger, d);
            }
            let fold: i64 = ledger.iter().map(|e| e.quantity).sum();
            prop_assert_eq!(balance(&ledger), fold);
        }

        /// Property: the balance never goes negative
        #[test]
        fn prop_balance_never_negative(deltas in prop::collection::vec(delta_strategy(), 0..50)) {
            let mut ledger = Vec::new();
            for d in deltas {
                let _ = append(&mut ledger, d);
            }
            prop_assert!(balance(&ledger) >= 0);
        }

        /// Property: each entry's new_balance continues from the previous
        /// entry's new_balance
        #[test]
        fn prop_chain_continuity(deltas in prop::collection::vec(delta_strategy(), 0..50)) {
            let mut ledger = Vec::new();
            for d in deltas {
                let _ = append(&mut ledger, d);
            }
            for window in ledger.windows(2) {
                prop_assert_eq!(window[1].previous_balance, window[0].new_balance);
            }
            for entry in &ledger {
                prop_assert_eq!(entry.new_balance, entry.previous_balance + entry.quantity);
            }
        }

        /// Property: with balance b, at most floor(b / q) withdrawals of q
        /// can succeed regardless of how many are attempted
        #[test]
        fn prop_withdrawal_count_bounded(
            initial in 1i64..1000,
            q in 1i64..100,
            attempts in 1usize..30,
        ) {
            let mut ledger = Vec::new();
            append(&mut ledger, initial).unwrap();

            let mut successes = 0;
            for _ in 0..attempts {
                if append(&mut ledger, -q).is_ok() {
                    successes += 1;
                }
            }
            prop_assert!(successes as i64 <= initial / q);
            prop_assert_eq!(balance(&ledger), initial - successes as i64 * q);
        }
    }
}
