//! Role levels and permission thresholds
//!
//! Permissions are a simple numeric ladder: every role carries a level and
//! an action is allowed when the user's level meets the action's threshold.
//! The thresholds below are the platform defaults; the backend lets
//! deployments override them through configuration.

/// Read-only catalog access
pub const LEVEL_VIEWER: i32 = 1;

/// Day-to-day stock operations (create and submit movement requests)
pub const LEVEL_OPERATOR: i32 = 10;

/// Review and apply movement requests
pub const LEVEL_SUPERVISOR: i32 = 20;

/// Full administration: user management, catalog edits, any request
pub const LEVEL_ADMIN: i32 = 50;

/// Whether a role level can review (approve/reject/apply) movement requests
pub fn can_approve(level: i32) -> bool {
    level >= LEVEL_SUPERVISOR
}

/// Whether a role level grants administrative rights
pub fn can_administer(level: i32) -> bool {
    level >= LEVEL_ADMIN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ladder_is_ordered() {
        assert!(LEVEL_VIEWER < LEVEL_OPERATOR);
        assert!(LEVEL_OPERATOR < LEVEL_SUPERVISOR);
        assert!(LEVEL_SUPERVISOR < LEVEL_ADMIN);
    }

    #[test]
    fn test_approval_threshold() {
        assert!(!can_approve(LEVEL_OPERATOR));
        assert!(can_approve(LEVEL_SUPERVISOR));
        assert!(can_approve(LEVEL_ADMIN));
    }

    #[test]
    fn test_admin_threshold() {
        assert!(!can_administer(LEVEL_SUPERVISOR));
        assert!(can_administer(LEVEL_ADMIN));
        assert!(can_administer(LEVEL_ADMIN + 10));
    }
}
