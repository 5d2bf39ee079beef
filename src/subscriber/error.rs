//! Error type surfaced to a subscriber's `on_error` callback (§4.F).

use thiserror::Error;

/// Errors a subscriber can report per relay; none of these tear down the
/// subscription (§4.F: "on failure invoke `on_error` if set and continue").
#[derive(Error, Debug)]
pub enum Error {
    /// Opening or sending on a relay session failed.
    #[error(transparent)]
    Relay(#[from] crate::relay::Error),

    /// A `kind = 1059` event failed to unwrap/unseal.
    #[error(transparent)]
    Envelope(#[from] crate::envelope::Error),
}
