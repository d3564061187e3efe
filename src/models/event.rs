use serde::Deserialize;

/// Envelope of an identity-provider webhook event. Transient - lives only for
/// the duration of request handling.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

/// Payload of `user.created` / `user.updated` events.
#[derive(Debug, Deserialize)]
pub struct UserEventData {
    /// Subject id of the user the event is about
    pub id: String,

    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserEventData {
    /// The provider sends an array of addresses; the first one is primary.
    pub fn primary_email(&self) -> String {
        self.email_addresses
            .first()
            .map(|e| e.email_address.clone())
            .unwrap_or_default()
    }

    pub fn full_name(&self) -> String {
        assemble_full_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

/// Joins name parts with a single space, dropping absent parts and
/// surrounding whitespace. Two empty parts yield an empty string.
pub fn assemble_full_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or(""), last.unwrap_or(""))
        .trim()
        .to_string()
}
