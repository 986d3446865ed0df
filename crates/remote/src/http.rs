//! Shared HTTP plumbing for hosted providers.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use quill_shared::config::HttpConfig;
use quill_shared::{AppError, AppResult};

/// Longest error body echoed back in a message.
const MAX_ERROR_BODY: usize = 500;

/// Builds the HTTP client used by every provider binding.
///
/// # Errors
///
/// Returns `Internal` if the TLS backend cannot be initialized.
pub fn build_client(config: &HttpConfig) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Internal(format!("failed to create HTTP client: {e}")))
}

/// Turns a transport failure into an error the caller can act on.
pub fn transport_error(err: &reqwest::Error, operation: &str) -> AppError {
    let detail = if err.is_timeout() {
        "timeout - the provider did not answer in time".to_string()
    } else if err.is_connect() {
        format!("connection error - check network connectivity and the endpoint URL: {err}")
    } else if err.is_decode() {
        format!("decode error - unexpected response format: {err}")
    } else {
        err.to_string()
    };
    AppError::ExternalService(format!("failed to {operation}: {detail}"))
}

/// Extracts the human-readable message from a provider error body.
///
/// Understands `message` (Appwrite, PostgREST), `msg` and
/// `error_description` (GoTrue) and a bare `error` string.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "msg", "error_description", "error"] {
            if let Some(text) = value.get(field).and_then(serde_json::Value::as_str) {
                if !text.trim().is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    truncate(body.trim())
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &text[..end])
}

/// Maps a non-success response onto the error taxonomy.
pub async fn status_error(response: Response, operation: &str) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match error_message(&body) {
        m if m.is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        m => m,
    };
    debug!(status = status.as_u16(), operation, %message, "provider rejected request");
    AppError::from_status(status.as_u16(), message)
}

/// Checks the status and decodes a JSON body.
///
/// # Errors
///
/// A mapped status error, or `ExternalService` when the body does not decode.
pub async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> AppResult<T> {
    if !response.status().is_success() {
        return Err(status_error(response, operation).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| transport_error(&e, operation))
}

/// Checks the status and discards the body.
///
/// # Errors
///
/// A mapped status error.
pub async fn expect_success(response: Response, operation: &str) -> AppResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(status_error(response, operation).await)
    }
}

/// True for 404 responses, which lookups read as absence.
pub fn is_not_found(response: &Response) -> bool {
    response.status() == StatusCode::NOT_FOUND
}
