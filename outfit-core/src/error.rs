use reqwest::StatusCode;
use thiserror::Error;

/// Problems detected while assembling configuration, before any I/O happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable `{0}`")]
    Missing(&'static str),

    #[error("Invalid value for `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Unknown timezone '{0}'. Expected an IANA name such as \"Australia/Sydney\".")]
    Timezone(String),
}

/// Non-success response from one of the upstream HTTP services.
#[derive(Debug, Error)]
#[error("{service} request failed with status {status}: {body}")]
pub struct HttpError {
    pub service: &'static str,
    pub status: StatusCode,
    pub body: String,
}

impl HttpError {
    pub fn new(service: &'static str, status: StatusCode, body: &str) -> Self {
        Self {
            service,
            status,
            body: truncate_body(body),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        crate::retry::is_retryable_status(self.status)
    }
}

/// Shorten an upstream body for inclusion in an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
