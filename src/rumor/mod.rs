//! Reservation rumor schemas (component C): builders and validators for the
//! two concrete rumor kinds this crate ships, plus the tag-construction
//! helpers they share.
//!
//! The envelope layer ([`crate::envelope`]) is generic over rumor kind; this
//! module is where the two concrete application schemas live.

mod error;
mod reservation_request;
mod reservation_response;
mod tags;

pub use error::{Error, Result};
pub use reservation_request::{
    build_request, validate_request, Contact, ReservationRequestParams, KIND_RESERVATION_REQUEST,
};
pub use reservation_response::{
    build_response, validate_response, ReservationResponseParams, Status, KIND_RESERVATION_RESPONSE,
};
pub use tags::TagBuilder;
