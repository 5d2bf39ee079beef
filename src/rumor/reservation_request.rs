//! Reservation-request rumor (`kind = 9901`), §4.C.

use crate::envelope::RumorPartial;

use super::error::{Error, Result};
use super::tags::TagBuilder;

/// `kind` of a reservation-request rumor.
pub const KIND_RESERVATION_REQUEST: u16 = 9901;

const MAX_PARTY_SIZE: u32 = 20;
const MIN_PARTY_SIZE: u32 = 1;
const MAX_NAME_LEN: usize = 200;

/// Contact details for a reservation request. At least one of `email`/
/// `telephone` must be present; both may be (§4.C "both allowed").
#[derive(Debug, Clone, Default)]
pub struct Contact {
    /// `mailto:...` address.
    pub email: Option<String>,
    /// `tel:...` number.
    pub telephone: Option<String>,
}

/// Caller-supplied fields for a reservation-request rumor.
#[derive(Debug, Clone)]
pub struct ReservationRequestParams {
    pub restaurant_pk: String,
    pub relay_url: Option<String>,
    pub party_size: u32,
    pub time: i64,
    pub tzid: String,
    pub name: String,
    pub contact: Contact,
    pub duration: Option<u32>,
    pub earliest_time: Option<i64>,
    pub latest_time: Option<i64>,
    pub broker: Option<bool>,
    pub content: String,
}

fn validate_contact(contact: &Contact) -> Result<()> {
    if contact.email.is_none() && contact.telephone.is_none() {
        return Err(Error::invalid("reservation request must provide an email or telephone contact"));
    }
    if let Some(email) = &contact.email {
        if !email.starts_with("mailto:") {
            return Err(Error::invalid("email contact must start with 'mailto:'"));
        }
    }
    if let Some(tel) = &contact.telephone {
        if !tel.starts_with("tel:") {
            return Err(Error::invalid("telephone contact must start with 'tel:'"));
        }
    }
    Ok(())
}

/// Validates and assembles a reservation-request rumor's tags/content.
///
/// # Errors
///
/// Returns [`Error::Invalid`] if `party_size` is outside `1..=20`, `name`
/// exceeds 200 characters, or `contact` has neither a valid email nor a
/// valid telephone. No partial result is produced on error (§8 property 6:
/// "no event is produced").
pub fn build_request(params: ReservationRequestParams) -> Result<RumorPartial> {
    if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&params.party_size) {
        return Err(Error::invalid(format!(
            "party_size must be between {MIN_PARTY_SIZE} and {MAX_PARTY_SIZE}, got {}",
            params.party_size
        )));
    }
    if params.name.chars().count() > MAX_NAME_LEN {
        return Err(Error::invalid(format!("name must be at most {MAX_NAME_LEN} characters")));
    }
    if params.tzid.is_empty() {
        return Err(Error::invalid("tzid must not be empty"));
    }
    validate_contact(&params.contact)?;

    let mut tags = vec![
        TagBuilder::p_tag(&params.restaurant_pk, params.relay_url.as_deref()),
        TagBuilder::party_size_tag(params.party_size),
        TagBuilder::time_tag(params.time),
        TagBuilder::tzid_tag(&params.tzid),
        TagBuilder::name_tag(&params.name),
    ];
    if let Some(email) = &params.contact.email {
        tags.push(TagBuilder::email_tag(email));
    }
    if let Some(tel) = &params.contact.telephone {
        tags.push(TagBuilder::telephone_tag(tel));
    }
    if let Some(duration) = params.duration {
        tags.push(TagBuilder::duration_tag(duration));
    }
    if let Some(earliest) = params.earliest_time {
        tags.push(TagBuilder::earliest_time_tag(earliest));
    }
    if let Some(latest) = params.latest_time {
        tags.push(TagBuilder::latest_time_tag(latest));
    }
    if let Some(broker) = params.broker {
        tags.push(TagBuilder::broker_tag(broker));
    }

    Ok(RumorPartial::new(KIND_RESERVATION_REQUEST).with_tags(tags).with_content(params.content))
}

/// Re-validates a received reservation-request rumor against the same
/// required-tag contract the builder enforces (§4.C "Validators of
/// received rumors re-check all required tags").
///
/// # Errors
///
/// Returns [`Error::Invalid`] if any required tag (`p`, `party_size`,
/// `time`, `tzid`, `name`, and at least one of `email`/`telephone`) is
/// missing or malformed.
pub fn validate_request(rumor: &crate::envelope::Rumor) -> Result<()> {
    if rumor.kind != KIND_RESERVATION_REQUEST {
        return Err(Error::invalid(format!("expected kind {KIND_RESERVATION_REQUEST}, got {}", rumor.kind)));
    }
    rumor.tag_value("p").ok_or_else(|| Error::invalid("missing required 'p' tag"))?;

    let party_size: u32 = rumor
        .tag_value("party_size")
        .ok_or_else(|| Error::invalid("missing required 'party_size' tag"))?
        .parse()
        .map_err(|_| Error::invalid("'party_size' tag is not a valid integer"))?;
    if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&party_size) {
        return Err(Error::invalid("'party_size' out of range 1..=20"));
    }

    rumor.tag_value("time").ok_or_else(|| Error::invalid("missing required 'time' tag"))?;
    rumor.tag_value("tzid").ok_or_else(|| Error::invalid("missing required 'tzid' tag"))?;
    let name = rumor.tag_value("name").ok_or_else(|| Error::invalid("missing required 'name' tag"))?;
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::invalid("'name' tag exceeds 200 characters"));
    }

    let email = rumor.tag_value("email");
    let telephone = rumor.tag_value("telephone");
    if email.is_none() && telephone.is_none() {
        return Err(Error::invalid("missing both 'email' and 'telephone' tags"));
    }
    if let Some(email) = email {
        if !email.starts_with("mailto:") {
            return Err(Error::invalid("'email' tag must start with 'mailto:'"));
        }
    }
    if let Some(tel) = telephone {
        if !tel.starts_with("tel:") {
            return Err(Error::invalid("'telephone' tag must start with 'tel:'"));
        }
    }
    Ok(())
}
