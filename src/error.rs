// src/error.rs

//! Unified error handling for the admin console.

use std::fmt;

use thiserror::Error;

/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("{context} failed with status {status}: {message}")]
    Status {
        context: String,
        status: u16,
        message: String,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// An account with this email already exists
    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    /// Caller tried to delete their own account
    #[error("Cannot delete your own account")]
    SelfDeletion,

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Identity provider rejected the request
    #[error("{0}")]
    Provider(String),

    /// Form input failed validation
    #[error("Invalid input: {}", format_fields(.0))]
    Form(Vec<FieldError>),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    /// Create a status error for a failed request.
    pub fn status(context: impl Into<String>, status: u16, message: impl fmt::Display) -> Self {
        Self::Status {
            context: context.into(),
            status,
            message: message.to_string(),
        }
    }

    /// Create an authorization error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create a provider error carrying the provider's own message.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Message suitable for showing to the user as-is.
    ///
    /// Server-reported messages are passed through verbatim; everything else
    /// falls back to the `Display` form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            Self::Provider(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_error_lists_every_field() {
        let err = AppError::Form(vec![
            FieldError::new("email", "Invalid email address"),
            FieldError::new("first_name", "too short"),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid input: email: Invalid email address; first_name: too short"
        );
    }

    #[test]
    fn user_message_passes_server_text_through() {
        let err = AppError::status("Add college", 400, "Type and Name are required");
        assert_eq!(err.user_message(), "Type and Name are required");

        let err = AppError::provider("That email address is taken.");
        assert_eq!(err.user_message(), "That email address is taken.");
    }

    #[test]
    fn user_message_falls_back_to_display() {
        assert_eq!(
            AppError::SelfDeletion.user_message(),
            "Cannot delete your own account"
        );
    }
}
