//! Movement request workflow tests
//!
//! Tests for the request lifecycle including:
//! - Status transition rules (draft, review, apply, terminal states)
//! - Warehouse requirements per movement type
//! - Role level gates for approval and administration
//! - Item validation at creation and submit

use shared::roles::{can_administer, can_approve, LEVEL_ADMIN, LEVEL_OPERATOR, LEVEL_SUPERVISOR, LEVEL_VIEWER};
use shared::validation::validate_quantity;

// ============================================================================
// Workflow simulation helpers
// ============================================================================

const STATUSES: [&str; 6] = [
    "DRAFT",
    "PENDING",
    "APPROVED",
    "REJECTED",
    "COMPLETED",
    "CANCELLED",
];

/// The legal transitions of a movement request
fn allowed(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("DRAFT", "PENDING")
            | ("DRAFT", "CANCELLED")
            | ("PENDING", "APPROVED")
            | ("PENDING", "REJECTED")
            | ("APPROVED", "COMPLETED")
    )
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "COMPLETED" | "REJECTED" | "CANCELLED")
}

/// Which warehouses a movement type must name
fn warehouse_requirements(movement_type: &str) -> (bool, bool) {
    match movement_type {
        "IN" => (false, true),
        "OUT" => (true, false),
        "TRANSFER" => (true, true),
        "ADJUSTMENT" => (false, false),
        _ => unreachable!(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test the happy path runs through four states
    #[test]
    fn test_happy_path() {
        let path = ["DRAFT", "PENDING", "APPROVED", "COMPLETED"];
        for window in path.windows(2) {
            assert!(allowed(window[0], window[1]));
        }
    }

    /// Test rejection ends the workflow
    #[test]
    fn test_rejection_is_terminal() {
        assert!(allowed("PENDING", "REJECTED"));
        assert!(is_terminal("REJECTED"));
        for to in STATUSES {
            assert!(!allowed("REJECTED", to));
        }
    }

    /// Test cancellation is only possible from draft
    #[test]
    fn test_cancel_draft_only() {
        assert!(allowed("DRAFT", "CANCELLED"));
        assert!(!allowed("PENDING", "CANCELLED"));
        assert!(!allowed("APPROVED", "CANCELLED"));
        assert!(!allowed("COMPLETED", "CANCELLED"));
    }

    /// Test approval cannot be skipped
    #[test]
    fn test_no_review_shortcut() {
        assert!(!allowed("DRAFT", "APPROVED"));
        assert!(!allowed("DRAFT", "COMPLETED"));
        assert!(!allowed("PENDING", "COMPLETED"));
    }

    /// Test nothing ever returns to draft
    #[test]
    fn test_no_return_to_draft() {
        for from in STATUSES {
            assert!(!allowed(from, "DRAFT"));
        }
    }

    /// Test terminal states accept no transition at all
    #[test]
    fn test_terminal_states_closed() {
        for from in STATUSES.iter().filter(|s| is_terminal(s)) {
            for to in STATUSES {
                assert!(!allowed(from, to), "{} -> {} should be refused", from, to);
            }
        }
    }

    /// Test warehouse requirements per movement type
    #[test]
    fn test_warehouse_requirements() {
        assert_eq!(warehouse_requirements("IN"), (false, true));
        assert_eq!(warehouse_requirements("OUT"), (true, false));
        assert_eq!(warehouse_requirements("TRANSFER"), (true, true));
        assert_eq!(warehouse_requirements("ADJUSTMENT"), (false, false));
    }

    /// Test role levels gate approval
    #[test]
    fn test_approval_level_gate() {
        assert!(!can_approve(LEVEL_VIEWER));
        assert!(!can_approve(LEVEL_OPERATOR));
        assert!(can_approve(LEVEL_SUPERVISOR));
        assert!(can_approve(LEVEL_ADMIN));
    }

    /// Test role levels gate administration
    #[test]
    fn test_admin_level_gate() {
        assert!(!can_administer(LEVEL_SUPERVISOR));
        assert!(can_administer(LEVEL_ADMIN));
    }

    /// Test item quantity validation
    #[test]
    fn test_item_quantity_validation() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(1_000_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    /// Test a request with no items is refused before any state change
    #[test]
    fn test_empty_request_refused() {
        let items: Vec<i64> = vec![];
        assert!(items.is_empty());
        let valid = !items.is_empty() && items.iter().all(|q| validate_quantity(*q).is_ok());
        assert!(!valid);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = &'static str> {
        prop::sample::select(STATUSES.to_vec())
    }

    proptest! {
        /// Property: transitions never target DRAFT
        #[test]
        fn prop_draft_unreachable(from in status_strategy()) {
            prop_assert!(!allowed(from, "DRAFT"));
        }

        /// Property: terminal states admit no outgoing transition
        #[test]
        fn prop_terminal_closed(from in status_strategy(), to in status_strategy()) {
            if is_terminal(from) {
                prop_assert!(!allowed(from, to));
            }
        }

        /// Property: every legal transition leaves its source state exactly once
        /// reachable along the matrix (no cycles)
        #[test]
        fn prop_no_cycles(start in status_strategy()) {
            // Walk greedily through allowed transitions; the matrix is a DAG
            // so any walk terminates within the number of states.
            let mut current = start;
            let mut steps = 0;
            loop {
                let next = STATUSES.iter().copied().find(|to| allowed(current, to));
                match next {
                    Some(to) => {
                        current = to;
                        steps += 1;
                        prop_assert!(steps <= STATUSES.len());
                    }
                    None => break,
                }
            }
        }

        /// Property: any level that can administer can also approve
        #[test]
        fn prop_admin_implies_approve(level in 0i32..100) {
            if can_administer(level) {
                prop_assert!(can_approve(level));
            }
        }
    }
}
