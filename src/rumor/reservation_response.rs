//! Reservation-response rumor (`kind = 9902`), §4.C.

use crate::envelope::RumorPartial;

use super::error::{Error, Result};
use super::tags::TagBuilder;

/// `kind` of a reservation-response rumor.
pub const KIND_RESERVATION_RESPONSE: u16 = 9902;

/// Outcome a reservation response carries in its `status` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Confirmed,
    Declined,
    Cancelled,
}

impl Status {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "declined" => Ok(Self::Declined),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::invalid(format!("unknown status '{other}'"))),
        }
    }
}

/// Caller-supplied fields for a reservation-response rumor.
#[derive(Debug, Clone)]
pub struct ReservationResponseParams {
    pub requester_pk: String,
    pub request_rumor_id: String,
    pub status: Status,
    pub time: i64,
    pub tzid: String,
    pub duration: u32,
    pub content: String,
}

fn validate_request_rumor_id(id: &str) -> Result<()> {
    if id.len() != 64 || !id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
        return Err(Error::invalid("request_rumor_id must be 64 lowercase hex characters"));
    }
    Ok(())
}

/// Validates and assembles a reservation-response rumor's tags/content.
///
/// # Errors
///
/// Returns [`Error::Invalid`] if `request_rumor_id` is not 64 lowercase hex
/// characters, or `tzid` is empty.
pub fn build_response(params: ReservationResponseParams) -> Result<RumorPartial> {
    validate_request_rumor_id(&params.request_rumor_id)?;
    if params.tzid.is_empty() {
        return Err(Error::invalid("tzid must not be empty"));
    }

    let tags = vec![
        TagBuilder::p_tag(&params.requester_pk, None),
        TagBuilder::e_tag(&params.request_rumor_id),
        TagBuilder::status_tag(params.status.as_str()),
        TagBuilder::time_tag(params.time),
        TagBuilder::tzid_tag(&params.tzid),
        TagBuilder::duration_tag(params.duration),
    ];

    Ok(RumorPartial::new(KIND_RESERVATION_RESPONSE).with_tags(tags).with_content(params.content))
}

/// Re-validates a received reservation-response rumor (§4.C).
///
/// # Errors
///
/// Returns [`Error::Invalid`] if any required tag (`p`, `e`, `status`,
/// `time`, `tzid`, `duration`) is missing or malformed.
pub fn validate_response(rumor: &crate::envelope::Rumor) -> Result<()> {
    if rumor.kind != KIND_RESERVATION_RESPONSE {
        return Err(Error::invalid(format!("expected kind {KIND_RESERVATION_RESPONSE}, got {}", rumor.kind)));
    }
    rumor.tag_value("p").ok_or_else(|| Error::invalid("missing required 'p' tag"))?;

    let e_tags = rumor.tag_values_all("e");
    let e_tag = e_tags.first().ok_or_else(|| Error::invalid("missing required 'e' tag"))?;
    if e_tag.len() != 3 {
        return Err(Error::invalid("'e' tag must have exactly 4 elements"));
    }
    validate_request_rumor_id(&e_tag[0])?;
    if e_tag[2] != "root" {
        return Err(Error::invalid("'e' tag marker must be 'root'"));
    }

    let status = rumor.tag_value("status").ok_or_else(|| Error::invalid("missing required 'status' tag"))?;
    Status::parse(status)?;

    rumor.tag_value("time").ok_or_else(|| Error::invalid("missing required 'time' tag"))?;
    rumor.tag_value("tzid").ok_or_else(|| Error::invalid("missing required 'tzid' tag"))?;
    rumor.tag_value("duration").ok_or_else(|| Error::invalid("missing required 'duration' tag"))?;
    Ok(())
}
