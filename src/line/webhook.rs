//! Webhook request body types.

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// A webhook event. Only message events are acted on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum MessageContent {
    Text {
        id: String,
        text: String,
    },
    Image {
        id: String,
        content_provider: Option<ContentProvider>,
    },
    #[serde(other)]
    Unsupported,
}

/// Where the bytes of an image message live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProvider {
    /// `line` for uploads through the app, `external` for images sent by URL.
    #[serde(rename = "type")]
    pub kind: String,
    pub original_content_url: Option<String>,
}

impl ContentProvider {
    /// URL to fetch the image from when it is not hosted by LINE.
    #[must_use]
    pub fn external_url(&self) -> Option<&str> {
        if self.kind == "external" {
            self.original_content_url.as_deref()
        } else {
            None
        }
    }
}

/// Parse a raw webhook body.
///
/// # Errors
///
/// Returns an error if the body is not a valid webhook payload.
pub fn parse_payload(body: &[u8]) -> Result<WebhookPayload> {
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_message_event() -> std::result::Result<(), &'static str> {
        let body = br#"{
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "mode": "active",
                "timestamp": 1700000000000,
                "replyToken": "reply-1",
                "source": {"type": "user", "userId": "U123"},
                "message": {"id": "m1", "type": "text", "text": "a red fox", "quoteToken": "q"}
            }]
        }"#;

        let payload = parse_payload(body).map_err(|_| "payload should parse")?;
        let [WebhookEvent::Message(event)] = payload.events.as_slice() else {
            return Err("expected one message event");
        };
        assert_eq!(event.reply_token.as_deref(), Some("reply-1"));
        assert_eq!(
            event.source.as_ref().and_then(|s| s.user_id.as_deref()),
            Some("U123")
        );
        assert_eq!(
            event.message,
            MessageContent::Text {
                id: "m1".to_string(),
                text: "a red fox".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn parses_external_image_provider() -> std::result::Result<(), &'static str> {
        let body = br#"{"events": [{
            "type": "message",
            "replyToken": "r",
            "source": {"type": "user", "userId": "U1"},
            "message": {
                "id": "m2",
                "type": "image",
                "contentProvider": {"type": "external", "originalContentUrl": "https://example.com/a.jpg"}
            }
        }]}"#;

        let payload = parse_payload(body).map_err(|_| "payload should parse")?;
        let [WebhookEvent::Message(event)] = payload.events.as_slice() else {
            return Err("expected one message event");
        };
        let MessageContent::Image {
            content_provider: Some(provider),
            ..
        } = &event.message
        else {
            return Err("expected an image with a content provider");
        };
        assert_eq!(provider.external_url(), Some("https://example.com/a.jpg"));
        Ok(())
    }

    #[test]
    fn unknown_events_and_message_types_are_tolerated() -> std::result::Result<(), &'static str> {
        let body = br#"{"events": [
            {"type": "follow", "replyToken": "r", "source": {"type": "user", "userId": "U1"}},
            {"type": "message", "source": {"type": "user", "userId": "U1"},
             "message": {"id": "m3", "type": "sticker", "packageId": "1", "stickerId": "2"}}
        ]}"#;

        let payload = parse_payload(body).map_err(|_| "payload should parse")?;
        assert_eq!(payload.events.len(), 2);
        assert_eq!(payload.events[0], WebhookEvent::Unsupported);
        let WebhookEvent::Message(event) = &payload.events[1] else {
            return Err("expected a message event");
        };
        assert_eq!(event.message, MessageContent::Unsupported);
        Ok(())
    }

    #[test]
    fn verification_request_has_no_events() -> std::result::Result<(), &'static str> {
        let payload =
            parse_payload(br#"{"destination":"U0","events":[]}"#).map_err(|_| "should parse")?;
        assert!(payload.events.is_empty());
        Ok(())
    }

    #[test]
    fn garbage_body_is_rejected() {
        assert!(parse_payload(b"not json").is_err());
    }
}
