//! Error types for steer

use thiserror::Error;

/// Result type alias using steer's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for steer operations
#[derive(Error, Debug)]
pub enum Error {
    /// A token sequence does not decode to valid UTF-8.
    ///
    /// Local to the candidate being previewed; a session that produced it
    /// is still usable.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The runtime failed while evaluating tokens.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A text-completion backend could not be reached or answered badly.
    #[error("Transport error{}: {message}", http_status(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("No completion satisfied the constraint after {attempts} attempts")]
    ConstraintExhausted {
        attempts: usize,
        last_text: Option<String>,
    },

    #[error("Invalid function name '{name}'. Must be one of: {available:?}")]
    InvalidFunctionSelection {
        name: String,
        available: Vec<String>,
    },

    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// A previous evaluation failed; the session must be discarded.
    #[error("Generation session is poisoned by an earlier evaluation failure")]
    SessionPoisoned,

    #[error("No valid candidate among the top {inspected} tokens")]
    NoValidCandidate { inspected: usize },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Missing API key: set {0}")]
    MissingApiKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error only concerns a single previewed candidate.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// A transport failure, with the HTTP status when one was received.
    #[must_use]
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }
}

fn http_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_message_includes_status() {
        let err = Error::transport(Some(503), "upstream unavailable");
        assert_eq!(
            err.to_string(),
            "Transport error (HTTP 503): upstream unavailable"
        );
        let err = Error::transport(None, "connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }
}
