use std::collections::BTreeMap;

/// Per-field validation messages, keyed by the form field name
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Please log in to continue")]
    MissingToken,

    #[error("Authentication token is malformed")]
    MalformedToken,

    #[error("Authentication token has expired")]
    ExpiredToken,

    #[error("Content must not be empty")]
    EmptyContent,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Invalid form: {}", .0.values().cloned().collect::<Vec<_>>().join(", "))]
    InvalidForm(FieldErrors),

    #[error("Server did not answer with a list")]
    NotAList,

    #[error("Server returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Remote {
        status: u16,
        message: Option<String>,
    },
}

impl Error {
    /// Errors raised before anything went on the wire
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::MissingToken
                | Error::MalformedToken
                | Error::ExpiredToken
                | Error::EmptyContent
                | Error::NullByteInString(_)
                | Error::InvalidRating(_)
                | Error::InvalidForm(_)
        )
    }

    /// Recovers the error a server answered with
    ///
    /// Bodies are expected to look like `{"message": "..."}`, but anything
    /// else still yields an error carrying the status.
    pub fn parse(status: u16, body: &[u8]) -> Error {
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|data| {
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .map(String::from)
            })
            .filter(|msg| !msg.trim().is_empty());
        match (status, message) {
            (403, None) => Error::PermissionDenied,
            (status, message) => Error::Remote { status, message },
        }
    }
}
