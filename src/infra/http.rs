//! Shared HTTP transport for indexer and node clients.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::chain::BackendFailure;
use crate::domain::ConfigError;

const MAX_ERROR_BODY: usize = 512;

/// Configuration for backend HTTP clients.
///
/// The timeout is the only one applied to backend calls; when it expires the
/// call surfaces as a transport failure.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub auth_token: Option<SecretString>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            auth_token: None,
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// Builds a reqwest client carrying the bearer token, if any.
    pub fn build(&self) -> Result<Client, ConfigError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ConfigError::InvalidValue {
                    key: "auth_token".to_string(),
                    message: e.to_string(),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Maps a reqwest error into the failure it represents.
pub fn transport_failure(err: reqwest::Error) -> BackendFailure {
    if err.is_decode() {
        return BackendFailure::malformed(err.to_string());
    }
    match err.status() {
        Some(status) => BackendFailure::http(status.as_u16(), err.to_string()),
        None => BackendFailure::no_response(err.to_string()),
    }
}

/// Reads a response body, turning non-success statuses into rejections.
pub async fn read_body(response: Response) -> Result<Vec<u8>, BackendFailure> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport_failure)?;
    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        return Err(BackendFailure::http(status.as_u16(), truncate(text.trim())));
    }
    Ok(body.to_vec())
}

/// Reads and decodes a JSON response body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendFailure> {
    let body = read_body(response).await?;
    decode_json(&body)
}

pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, BackendFailure> {
    serde_json::from_slice(body).map_err(|e| BackendFailure::malformed(e.to_string()))
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
