// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::BackendConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &BackendConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Pass a successful response through; turn anything else into
/// [`AppError::Status`] carrying the server's own message when it sent one.
pub async fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_default();
    log::warn!("{context} returned {status}");
    Err(AppError::status(context, status.as_u16(), message))
}

/// Check the status and decode a JSON body.
pub async fn read_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let response = check_status(response, context).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull a human readable message out of an error body.
///
/// Understands `{"detail": "..."}`, `{"detail": [{"msg": ...}]}`,
/// `{"details" | "message" | "error": "..."}` and
/// `{"errors": [{"message": ...}]}`. Plain-text bodies are returned trimmed.
pub fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    for key in ["detail", "details", "message", "error"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Array(items)) => {
                let joined = joined_messages(items, "msg");
                if joined.is_some() {
                    return joined;
                }
            }
            _ => {}
        }
    }

    value
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|items| joined_messages(items, "message"))
}

fn joined_messages(items: &[Value], key: &str) -> Option<String> {
    let messages: Vec<&str> = items
        .iter()
        .filter_map(|item| item.get(key).and_then(Value::as_str))
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        let config = BackendConfig::default();
        assert!(create_async_client(&config).is_ok());
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"detail": "College not found"}"#).as_deref(),
            Some("College not found")
        );
        assert_eq!(
            error_message(r#"{"details": "duplicate key"}"#).as_deref(),
            Some("duplicate key")
        );
        assert_eq!(
            error_message(r#"{"detail": [{"msg": "field required"}, {"msg": "bad type"}]}"#)
                .as_deref(),
            Some("field required; bad type")
        );
        assert_eq!(
            error_message(r#"{"errors": [{"message": "That email address is taken."}]}"#)
                .as_deref(),
            Some("That email address is taken.")
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message("  "), None);
        assert_eq!(error_message("Bad Gateway\n").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message(r#"{"ok": false}"#), None);
    }
}
