//! Input validation for API requests.
//!
//! Field validators return `Err(message)`; the request-level functions
//! collect them into a single `ApiError` with per-field messages using
//! `ValidationErrorBuilder`.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{ItemPayload, Role, SignupRequest};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

pub const USERNAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const NAME_MAX: usize = 255;
pub const TYPE_MAX: usize = 50;
pub const SERIAL_NUMBER_MAX: usize = 100;
pub const BARCODE_MAX: usize = 100;
pub const LOCATION_MAX: usize = 255;
pub const STATUS_MAX: usize = 50;

lazy_static! {
    /// Letters, digits and @ . + - _
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();

    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$"
    ).unwrap();
}

/// Validate a value against a maximum length in characters
pub fn validate_max_length(value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("Ensure this field has no more than {} characters.", max));
    }
    Ok(())
}

/// Validate a required, non-blank text value
pub fn validate_text(value: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(BLANK.to_string());
    }
    validate_max_length(value, max)
}

/// Validate an optional request field that must be present unless `partial`
pub fn validate_field(value: Option<&str>, max: usize, partial: bool) -> Result<(), String> {
    match value {
        Some(v) => validate_text(v, max),
        None if partial => Ok(()),
        None => Err(REQUIRED.to_string()),
    }
}

pub fn validate_username(username: &str) -> Result<(), String> {
    validate_text(username, USERNAME_MAX)?;

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    validate_text(email, EMAIL_MAX)?;

    if !EMAIL_REGEX.is_match(email) {
        return Err("Enter a valid email address.".to_string());
    }

    Ok(())
}

/// Validate a signup request and resolve the requested role
pub fn validate_signup(req: &SignupRequest) -> Result<Role, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    match req.username.as_deref() {
        Some(username) => errors.check("username", validate_username(username)),
        None => errors.add("username", REQUIRED),
    };

    match req.email.as_deref() {
        Some(email) => errors.check("email", validate_email(email)),
        None => errors.add("email", REQUIRED),
    };

    match req.password.as_deref() {
        None => {
            errors.add("password", REQUIRED);
        }
        Some("") => {
            errors.add("password", BLANK);
        }
        Some(_) => {}
    }

    let role = Role::from_flags(req.is_admin.unwrap_or(false), req.is_user.unwrap_or(true));
    if role.is_none() {
        errors.add("is_user", "An account must be either an admin or a regular user.");
    }

    errors.finish()?;
    Ok(role.unwrap_or(Role::User))
}

/// Validate an item body. `partial` is set for PATCH, where omitted
/// fields keep their current value.
pub fn validate_item(payload: &ItemPayload, partial: bool) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors
        .check("name", validate_field(payload.name.as_deref(), NAME_MAX, partial))
        .check("type", validate_field(payload.item_type.as_deref(), TYPE_MAX, partial))
        .check(
            "serial_number",
            validate_field(payload.serial_number.as_deref(), SERIAL_NUMBER_MAX, partial),
        )
        .check("location", validate_field(payload.location.as_deref(), LOCATION_MAX, partial))
        .check("status", validate_field(payload.status.as_deref(), STATUS_MAX, partial));

    // Barcode may be absent, null or blank
    if let Some(Some(barcode)) = &payload.barcode {
        errors.check("barcode", validate_max_length(barcode, BARCODE_MAX));
    }

    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(json: &str) -> ItemPayload {
        serde_json::from_str(json).unwrap()
    }

    fn signup(json: &str) -> SignupRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("alice.smith+it@corp-1_x").is_ok());
        assert!(validate_username(&"a".repeat(150)).is_ok());
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_emails() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_max_length_counts_characters() {
        assert!(validate_max_length("ééééé", 5).is_ok());
        assert!(validate_max_length("éééééé", 5).is_err());
    }

    #[test]
    fn test_validate_field() {
        assert_eq!(validate_field(None, 10, false), Err(REQUIRED.to_string()));
        assert_eq!(validate_field(None, 10, true), Ok(()));
        assert_eq!(validate_field(Some("  "), 10, true), Err(BLANK.to_string()));
        assert!(validate_field(Some("ok"), 10, false).is_ok());
    }

    #[test]
    fn test_signup_defaults_to_user_role() {
        let req = signup(r#"{"username": "alice", "email": "a@x.com", "password": "p1"}"#);
        assert_eq!(validate_signup(&req).unwrap(), Role::User);
    }

    #[test]
    fn test_signup_admin_role() {
        let req = signup(
            r#"{"username": "root", "email": "r@x.com", "password": "p", "is_admin": true, "is_user": true}"#,
        );
        assert_eq!(validate_signup(&req).unwrap(), Role::Admin);
    }

    #[test]
    fn test_signup_missing_fields() {
        let err = validate_signup(&signup("{}")).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("3 fields"));
    }

    #[test]
    fn test_signup_rejects_roleless_account() {
        let req = signup(
            r#"{"username": "x", "email": "x@x.com", "password": "p", "is_admin": false, "is_user": false}"#,
        );
        assert!(validate_signup(&req).is_err());
    }

    #[test]
    fn test_item_create_requires_fields() {
        let err = validate_item(&item(r#"{"name": "Laptop"}"#), false).unwrap_err();
        assert!(err.to_string().contains("4 fields"));
    }

    #[test]
    fn test_item_partial_accepts_subset() {
        assert!(validate_item(&item(r#"{"status": "available"}"#), true).is_ok());
        assert!(validate_item(&item(r#"{"status": ""}"#), true).is_err());
    }

    #[test]
    fn test_item_type_length() {
        let body = format!(
            r#"{{"name": "n", "type": "{}", "serial_number": "s", "location": "l", "status": "s"}}"#,
            "t".repeat(51)
        );
        assert!(validate_item(&item(&body), false).is_err());
    }

    #[test]
    fn test_item_barcode_optional() {
        let base = r#""name": "n", "type": "t", "serial_number": "s", "location": "l", "status": "s""#;
        assert!(validate_item(&item(&format!("{{{}}}", base)), false).is_ok());
        assert!(validate_item(&item(&format!(r#"{{{}, "barcode": null}}"#, base)), false).is_ok());
        assert!(validate_item(&item(&format!(r#"{{{}, "barcode": ""}}"#, base)), false).is_ok());
    }
}
