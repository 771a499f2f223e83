use std::fmt;

/// Result type alias for keyload core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for keyload core operations
///
/// Payload mismatches are not errors; see [`crate::workload::VerificationMismatch`].
#[derive(Debug)]
pub enum Error {
    /// I/O errors (e.g. spawning the tracker thread)
    Io(std::io::Error),

    /// Configuration errors
    Config(String),

    /// Completion tracker errors
    Tracker(String),

    /// Other errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::Tracker(msg) => write!(f, "Tracker error: {msg}"),
            Error::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
