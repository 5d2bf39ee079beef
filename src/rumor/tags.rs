//! Tag builders for reservation-request/-response rumors (§4.C).

/// Builder for the tag vectors used by reservation rumors.
///
/// Provides static methods for constructing properly formatted tags; kept
/// separate from validation (in [`super::error`]/the builder modules) so
/// the shape of a tag and the rule it must satisfy can be tested
/// independently.
pub struct TagBuilder;

impl TagBuilder {
    /// Builds a `p` tag addressing `pubkey`, with an optional relay hint.
    ///
    /// ```
    /// use envoy_core::rumor::TagBuilder;
    ///
    /// let tag = TagBuilder::p_tag("abc123", None);
    /// assert_eq!(tag, vec!["p", "abc123"]);
    ///
    /// let tag = TagBuilder::p_tag("abc123", Some("wss://relay.example"));
    /// assert_eq!(tag, vec!["p", "abc123", "wss://relay.example"]);
    /// ```
    #[must_use]
    pub fn p_tag(pubkey: &str, relay_url: Option<&str>) -> Vec<String> {
        let mut tag = vec!["p".to_string(), pubkey.to_string()];
        if let Some(url) = relay_url {
            tag.push(url.to_string());
        }
        tag
    }

    /// Builds the `["e", request_rumor_id, "", "root"]` back-reference tag
    /// carried by every reservation-response rumor.
    ///
    /// ```
    /// use envoy_core::rumor::TagBuilder;
    ///
    /// let tag = TagBuilder::e_tag("deadbeef");
    /// assert_eq!(tag, vec!["e", "deadbeef", "", "root"]);
    /// ```
    #[must_use]
    pub fn e_tag(request_rumor_id: &str) -> Vec<String> {
        vec!["e".to_string(), request_rumor_id.to_string(), String::new(), "root".to_string()]
    }

    #[must_use]
    pub fn party_size_tag(n: u32) -> Vec<String> {
        vec!["party_size".to_string(), n.to_string()]
    }

    #[must_use]
    pub fn time_tag(unix_seconds: i64) -> Vec<String> {
        vec!["time".to_string(), unix_seconds.to_string()]
    }

    #[must_use]
    pub fn tzid_tag(iana_zone: &str) -> Vec<String> {
        vec!["tzid".to_string(), iana_zone.to_string()]
    }

    #[must_use]
    pub fn name_tag(name: &str) -> Vec<String> {
        vec!["name".to_string(), name.to_string()]
    }

    #[must_use]
    pub fn email_tag(mailto: &str) -> Vec<String> {
        vec!["email".to_string(), mailto.to_string()]
    }

    #[must_use]
    pub fn telephone_tag(tel: &str) -> Vec<String> {
        vec!["telephone".to_string(), tel.to_string()]
    }

    #[must_use]
    pub fn duration_tag(seconds: u32) -> Vec<String> {
        vec!["duration".to_string(), seconds.to_string()]
    }

    #[must_use]
    pub fn earliest_time_tag(unix_seconds: i64) -> Vec<String> {
        vec!["earliest_time".to_string(), unix_seconds.to_string()]
    }

    #[must_use]
    pub fn latest_time_tag(unix_seconds: i64) -> Vec<String> {
        vec!["latest_time".to_string(), unix_seconds.to_string()]
    }

    #[must_use]
    pub fn broker_tag(broker: bool) -> Vec<String> {
        vec!["broker".to_string(), if broker { "True" } else { "False" }.to_string()]
    }

    #[must_use]
    pub fn status_tag(status: &str) -> Vec<String> {
        vec!["status".to_string(), status.to_string()]
    }
}
