//! Error type for rumor builders/validators (§4.C).

use thiserror::Error;

/// A rumor builder rejected its input, or a validator rejected a received rumor.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid rumor: {0}")]
    Invalid(String),
}

/// Result type alias for rumor schema operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
