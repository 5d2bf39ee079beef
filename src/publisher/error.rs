//! Error type for the publisher (§4.E).

use thiserror::Error;

/// Errors the publisher can raise before attempting to publish at all.
#[derive(Error, Debug)]
pub enum Error {
    /// A relay URL failed validation (see [`crate::relay::validate_relay_urls`]).
    #[error(transparent)]
    InvalidUrl(#[from] crate::relay::Error),
}

/// Result type for publisher operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_wraps_relay_error() {
        let relay_err = crate::relay::Error::InvalidUrl("ws://x".to_string());
        let err: Error = relay_err.into();
        assert!(err.to_string().contains("ws://x"));
    }
}
