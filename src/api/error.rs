//! Unified API error handling.
//!
//! Every failure leaves the API as `{"error": "<message>"}`. Validation
//! failures add a `fields` map of per-field messages.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::db::StoreError;

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Client errors (4xx)
    BadRequest,
    ValidationError,
    /// Wrong username or password
    AuthenticationFailed,
    /// Missing or unknown bearer token
    NotAuthenticated,
    NotFound,

    // Server errors (5xx)
    InternalError,
    DatabaseError,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            ErrorCode::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::AuthenticationFailed => "authentication_failed",
            ErrorCode::NotAuthenticated => "not_authenticated",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::DatabaseError => "database_error",
        }
    }
}

/// The JSON body of an error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, Vec<String>>>,
}

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    fields: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Bad request error (400), e.g. a body that is not valid JSON
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Login with unknown username or wrong password (401)
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::AuthenticationFailed, "Invalid credentials")
    }

    /// No usable token on a protected route (401)
    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotAuthenticated, message)
    }

    /// Not found error (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Validation error (400) with field-level details
    pub fn validation(errors: HashMap<String, Vec<String>>) -> Self {
        let message = if errors.len() == 1 {
            errors
                .values()
                .next()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| "Validation failed".to_string())
        } else {
            format!("Validation failed for {} fields", errors.len())
        };

        Self {
            code: ErrorCode::ValidationError,
            message,
            fields: Some(errors),
        }
    }

    /// Single field validation error
    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::validation(errors)
    }

    /// Internal server error (500)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error (500)
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let response = ErrorResponse {
            error: self.message,
            fields: self.fields,
        };

        (status, Json(response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

// -------------------------------------------------------------------------
// Conversion implementations for common error types
// -------------------------------------------------------------------------

/// Message reported when a unique column already holds the submitted value
fn duplicate_message(field: &str) -> String {
    match field {
        "username" => "A user with that username already exists.".to_string(),
        "email" => "A user with that email already exists.".to_string(),
        "serial_number" => "inventory item with this serial number already exists.".to_string(),
        other => format!("An entry with this {} already exists.", other),
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => {
                ApiError::validation_field(field, duplicate_message(field))
            }
            StoreError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ApiError::database("A database error occurred")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// -------------------------------------------------------------------------
// Builder for validation errors (integrates with the validation module)
// -------------------------------------------------------------------------

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the error of a `Result`-returning validator, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Build the ApiError if there are any errors
    pub fn build(self) -> Option<ApiError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(ApiError::validation(self.errors))
        }
    }

    /// Return Ok(()) if no errors, or Err(ApiError) if there are errors
    pub fn finish(self) -> Result<(), ApiError> {
        match self.build() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_codes() {
        assert_eq!(ErrorCode::ValidationError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::AuthenticationFailed.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NotAuthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::DatabaseError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_credentials_body() {
        let err = ApiError::invalid_credentials();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let body = serde_json::to_value(ErrorResponse {
            error: err.message,
            fields: err.fields,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"error": "Invalid credentials"}));
    }

    #[test]
    fn test_validation_error_single_field() {
        let err = ApiError::validation_field("name", "This field is required.");
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "This field is required.");
    }

    #[test]
    fn test_validation_error_multiple_fields() {
        let mut errors = HashMap::new();
        errors.insert("name".to_string(), vec!["This field is required.".to_string()]);
        errors.insert("status".to_string(), vec!["This field is required.".to_string()]);

        let err = ApiError::validation(errors);
        assert!(err.message.contains("2 fields"));
    }

    #[test]
    fn test_duplicate_maps_to_field_error() {
        let err = ApiError::from(StoreError::Duplicate { field: "serial_number" });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let fields = err.fields.unwrap();
        assert_eq!(
            fields["serial_number"],
            vec!["inventory item with this serial number already exists.".to_string()]
        );
    }

    #[test]
    fn test_database_error_hides_details() {
        let err = ApiError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "A database error occurred");
    }

    #[test]
    fn test_validation_error_builder() {
        let mut builder = ValidationErrorBuilder::new();
        builder.add("name", "This field is required.");
        builder.check("type", Err("Ensure this field has no more than 50 characters.".to_string()));
        builder.check("status", Ok(()));
        builder.add("name", "second");

        assert!(!builder.is_empty());

        let err = builder.build().unwrap();
        let fields = err.fields.unwrap();
        assert_eq!(fields["name"].len(), 2);
        assert_eq!(fields["type"].len(), 1);
        assert!(!fields.contains_key("status"));
    }

    #[test]
    fn test_empty_builder_finishes_ok() {
        assert!(ValidationErrorBuilder::new().finish().is_ok());
    }
}
