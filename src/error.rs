use thiserror::Error;

/// Errors surfaced by the REST boundary. All variants carry a message that is
/// shown to the user as-is, so keep them human-readable.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {status}")]
    Status { status: u16 },

    #[error("Parse error: {0}")]
    Decode(String),

    #[error("Serialize error: {0}")]
    Encode(String),
}

impl ApiError {
    pub fn network(e: impl std::fmt::Display) -> Self {
        ApiError::Network(e.to_string())
    }

    pub fn decode(e: impl std::fmt::Display) -> Self {
        ApiError::Decode(e.to_string())
    }

    pub fn encode(e: impl std::fmt::Display) -> Self {
        ApiError::Encode(e.to_string())
    }
}
