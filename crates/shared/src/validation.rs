//! Input normalization and common validation utilities.
//!
//! Email addresses and codes arrive in whatever shape the client typed
//! them; every lookup key is normalized here, once, so the uniqueness
//! invariants in the storage layer hold regardless of input casing.

use validator::ValidationError;

/// Maximum accepted display name length.
const MAX_DISPLAY_NAME_LENGTH: usize = 50;

/// Normalizes an email address for storage and lookups (trim + lowercase).
///
/// At most one non-rejected application and one profile may exist per
/// normalized email.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalizes an invite or referral code (trim + uppercase).
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Validates that a display name is non-blank and within length limits.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Display name must not be blank".into());
        return Err(err);
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some("Display name must be at most 50 characters".into());
        return Err(err);
    }
    Ok(())
}
