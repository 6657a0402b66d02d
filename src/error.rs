//! Error types for the knowledge-index pipeline.

use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Error type covering the failure families of the pipeline.
///
/// The two central kinds mirror what can actually go wrong here: a document
/// that cannot be flattened into text, and a remote call that failed. There
/// is no retry or recovery policy: errors propagate to the entry point,
/// which reports them and exits non-zero.
#[derive(Error, Debug)]
pub enum Error {
    /// A document could not be flattened or has an invalid JSON shape.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A remote call failed: network, auth, schema rejection, or a
    /// malformed response.
    #[error("{service} service error: {message}")]
    RemoteService {
        service: &'static str,
        message: String,
    },

    /// Configuration is incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::RemoteService`] tagged with the failing
    /// collaborator (`"search"`, `"embedding"`, or `"chat"`).
    pub fn remote(service: &'static str, message: impl Into<String>) -> Self {
        Error::RemoteService {
            service,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Extract a human-readable message from a remote error body.
///
/// The search and model services wrap failures as `{"error": {"message":
/// ...}}`; fall back to the raw body when the shape differs.
pub(crate) fn remote_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
