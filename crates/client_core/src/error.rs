use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} {path} returned status {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },
    #[error("cookie '{cookie}' is not set; fetch the page before submitting forms")]
    MissingCsrfToken { cookie: String },
    #[error("unexpected content type '{content_type}' from {path}")]
    UnexpectedContentType { path: String, content_type: String },
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Transport-level failures as opposed to an unexpected payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}
