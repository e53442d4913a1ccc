//! Discord REST request bodies and error classification.
//!
//! Kept free of any HTTP client so the JSON shapes can be checked in tests.

use embedg_actions::Reply;
use embedg_core::{ActionEmbed, ActionRow};
use embedg_error::PlatformErrorKind;
use serde_json::{Map, Value, json};

/// `CHANNEL_MESSAGE_WITH_SOURCE` interaction callback type.
pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

/// Message flag hiding a reply from everyone but the invoking user.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

const UNKNOWN_MEMBER: i64 = 10007;
const UNKNOWN_MESSAGE: i64 = 10008;
const UNKNOWN_ROLE: i64 = 10011;
const UNKNOWN_INTERACTION: i64 = 10062;
const MISSING_ACCESS: i64 = 50001;
const MISSING_PERMISSIONS: i64 = 50013;

/// Embed object for one [`ActionEmbed`].
pub fn embed_payload(embed: &ActionEmbed) -> Value {
    let mut object = Map::new();
    if let Some(title) = embed.title() {
        object.insert("title".into(), json!(title));
    }
    if let Some(description) = embed.description() {
        object.insert("description".into(), json!(description));
    }
    if let Some(url) = embed.url() {
        object.insert("url".into(), json!(url));
    }
    if let Some(color) = embed.color() {
        object.insert("color".into(), json!(color));
    }
    if let Some(footer) = embed.footer() {
        object.insert("footer".into(), json!({ "text": footer }));
    }
    if let Some(image_url) = embed.image_url() {
        object.insert("image".into(), json!({ "url": image_url }));
    }
    Value::Object(object)
}

/// Message body for a reply, used for follow-ups as is.
///
/// Mentions never ping: role notes like `<@&id>` render without notifying
/// anyone.
pub fn message_payload(reply: &Reply) -> Value {
    let reply = reply.clone().truncated();
    let mut object = Map::new();
    if let Some(content) = reply.content() {
        object.insert("content".into(), json!(content));
    }
    if !reply.embeds().is_empty() {
        let embeds: Vec<Value> = reply.embeds().iter().map(embed_payload).collect();
        object.insert("embeds".into(), Value::Array(embeds));
    }
    if *reply.ephemeral() {
        object.insert("flags".into(), json!(EPHEMERAL_FLAG));
    }
    object.insert("allowed_mentions".into(), json!({ "parse": [] }));
    Value::Object(object)
}

/// Initial interaction response carrying a reply.
pub fn interaction_response(reply: &Reply) -> Value {
    json!({
        "type": CHANNEL_MESSAGE_WITH_SOURCE,
        "data": message_payload(reply),
    })
}

/// Message edit body replacing every component row.
pub fn components_payload(rows: &[ActionRow]) -> Value {
    json!({ "components": rows })
}

/// Read component rows from their JSON form.
///
/// # Errors
///
/// Returns the decode error if the value is not a list of action rows.
pub fn rows_from_value(value: Value) -> Result<Vec<ActionRow>, serde_json::Error> {
    serde_json::from_value(value)
}

/// Map a failed Discord response to a platform error kind.
pub fn classify(status: u16, code: i64, message: &str) -> PlatformErrorKind {
    match (status, code) {
        (_, UNKNOWN_ROLE) => PlatformErrorKind::UnknownRole(message.to_string()),
        (_, UNKNOWN_MEMBER) => PlatformErrorKind::UnknownMember(message.to_string()),
        (_, UNKNOWN_MESSAGE) => PlatformErrorKind::UnknownMessage(message.to_string()),
        (_, UNKNOWN_INTERACTION) => PlatformErrorKind::InteractionExpired,
        (_, MISSING_ACCESS | MISSING_PERMISSIONS) | (403, _) => {
            PlatformErrorKind::Forbidden(message.to_string())
        }
        (429, _) => PlatformErrorKind::RateLimited(message.to_string()),
        _ => PlatformErrorKind::Request(format!("{status}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_response_sets_flag() {
        let body = interaction_response(&Reply::ephemeral_text("nope"));
        assert_eq!(body["type"], 4);
        assert_eq!(body["data"]["content"], "nope");
        assert_eq!(body["data"]["flags"], 64);
        assert_eq!(body["data"]["allowed_mentions"]["parse"], json!([]));
    }

    #[test]
    fn test_public_reply_has_no_flags() {
        let body = message_payload(&Reply::public_text("hi"));
        assert!(body.get("flags").is_none());
    }

    #[test]
    fn test_embed_payload_skips_missing_fields() {
        let embed = ActionEmbed::new().with_title("Rules").with_color(0x00ff00);
        let body = embed_payload(&embed);
        assert_eq!(body, json!({ "title": "Rules", "color": 0x00ff00 }));
    }

    #[test]
    fn test_long_content_is_truncated() {
        let body = message_payload(&Reply::public_text("x".repeat(2500)));
        assert_eq!(body["content"].as_str().map(str::len), Some(2000));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(classify(404, 10011, "Unknown Role"), PlatformErrorKind::UnknownRole(_)));
        assert!(matches!(classify(404, 10007, "Unknown Member"), PlatformErrorKind::UnknownMember(_)));
        assert!(matches!(classify(404, 10062, "Unknown interaction"), PlatformErrorKind::InteractionExpired));
        assert!(matches!(classify(403, 50013, "Missing Permissions"), PlatformErrorKind::Forbidden(_)));
        assert!(matches!(classify(429, 0, "slow down"), PlatformErrorKind::RateLimited(_)));
        assert!(matches!(classify(500, 0, "oops"), PlatformErrorKind::Request(_)));
    }

    #[test]
    fn test_rows_round_trip_through_json() {
        let value = json!([{
            "type": 1,
            "components": [{ "type": 2, "style": 1, "label": "Go", "custom_id": "act1:abc" }]
        }]);
        let rows = rows_from_value(value).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(components_payload(&rows)["components"][0]["components"][0]["custom_id"], "act1:abc");
    }
}
