use client_core::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("missing page element: {0}")]
    MissingElement(String),
    #[error("backend did not return a user for {0}")]
    MissingUser(&'static str),
}

impl FlowError {
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingElement(what.into())
    }
}
