//! Common validation utilities.

use validator::ValidationError;

/// Role names accepted for club memberships and invitations.
pub const ROLE_NAMES: [&str; 4] = ["admin", "head_coach", "assistant_coach", "parent"];

/// Trims and lowercases an email address.
///
/// Every email that reaches the token tables goes through this first, so
/// lookups by email are exact matches.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validates that a role name is one of the known club roles.
pub fn validate_role(role: &str) -> Result<(), ValidationError> {
    if ROLE_NAMES.contains(&role) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_role");
        err.message =
            Some("Role must be one of: admin, head_coach, assistant_coach, parent".into());
        Err(err)
    }
}

/// Validates that a club name is not blank.
pub fn validate_club_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank_name");
        err.message = Some("Club name cannot be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
