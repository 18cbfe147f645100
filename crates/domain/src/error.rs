/// Shared error type used across all SessionGate crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The key-value call itself failed (connection, protocol, server error).
    #[error("backend {backend}: {message}")]
    Backend { backend: String, message: String },

    /// A stored or attached document failed structural validation.
    #[error("envelope corrupt: {0}")]
    EnvelopeCorrupt(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
