use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure or a backend/ledger outage. Resubmitting the same request is safe.
    #[error("{message}")]
    Transient { status: Option<u16>, message: String },

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transient { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transient {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}
