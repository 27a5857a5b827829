//! HTTP client for the LINE Messaging API.

use log::debug;
use reqwest::{Client, RequestBuilder, Response, header::CONTENT_TYPE};
use serde::Serialize;

use crate::error::{RelayError, Result};
use crate::relay::Messenger;
use crate::types::{DEFAULT_IMAGE_MIME, ImageData};

const LINE_API_BASE: &str = "https://api.line.me/v2/bot";
const LINE_DATA_API_BASE: &str = "https://api-data.line.me/v2/bot";

/// LINE rejects text messages longer than this many characters.
const MAX_TEXT_CHARS: usize = 5000;

/// A message object in a reply or push request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum OutgoingMessage {
    Text {
        text: String,
    },
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = if text.chars().count() > MAX_TEXT_CHARS {
            text.chars().take(MAX_TEXT_CHARS).collect()
        } else {
            text
        };
        OutgoingMessage::Text { text }
    }

    /// Image message using the same URL for the full image and its preview.
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        OutgoingMessage::Image {
            original_content_url: url.clone(),
            preview_image_url: url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutgoingMessage],
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [OutgoingMessage],
}

pub struct LineClient {
    access_token: String,
    client: Client,
    api_base: String,
    data_api_base: String,
}

impl LineClient {
    pub fn new(access_token: String, client: Client) -> Self {
        Self {
            access_token,
            client,
            api_base: LINE_API_BASE.to_string(),
            data_api_base: LINE_DATA_API_BASE.to_string(),
        }
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/{path}", self.api_base))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

async fn download(request: RequestBuilder) -> Result<ImageData> {
    let response = check_status(request.send().await?).await?;
    let mime_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_IMAGE_MIME)
        .to_string();
    let bytes = response.bytes().await?.to_vec();
    debug!("Downloaded image: {} bytes, {mime_type}", bytes.len());
    Ok(ImageData::new(bytes, mime_type))
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
    Err(RelayError::LineApi { status, message })
}

impl Messenger for LineClient {
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingMessage>) -> Result<()> {
        debug!("Replying with {} messages", messages.len());
        self.post_json(
            "message/reply",
            &ReplyRequest {
                reply_token,
                messages: &messages,
            },
        )
        .await
    }

    async fn push(&self, to: &str, messages: Vec<OutgoingMessage>) -> Result<()> {
        debug!("Pushing {} messages to {to}", messages.len());
        self.post_json(
            "message/push",
            &PushRequest {
                to,
                messages: &messages,
            },
        )
        .await
    }

    async fn fetch_content(&self, message_id: &str) -> Result<ImageData> {
        let request = self
            .client
            .get(format!(
                "{}/message/{message_id}/content",
                self.data_api_base
            ))
            .bearer_auth(&self.access_token);
        download(request).await
    }

    async fn fetch_external(&self, url: &str) -> Result<ImageData> {
        download(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn messages_serialize_to_line_shape() -> serde_json::Result<()> {
        let messages = [
            OutgoingMessage::text("hello"),
            OutgoingMessage::image("https://cdn.example.com/a.png"),
        ];
        let body = serde_json::to_value(PushRequest {
            to: "U1",
            messages: &messages,
        })?;

        assert_eq!(
            body,
            json!({
                "to": "U1",
                "messages": [
                    {"type": "text", "text": "hello"},
                    {
                        "type": "image",
                        "originalContentUrl": "https://cdn.example.com/a.png",
                        "previewImageUrl": "https://cdn.example.com/a.png"
                    }
                ]
            })
        );
        Ok(())
    }

    #[test]
    fn reply_token_is_camel_cased() -> serde_json::Result<()> {
        let body = serde_json::to_value(ReplyRequest {
            reply_token: "r1",
            messages: &[OutgoingMessage::text("ok")],
        })?;
        assert_eq!(body["replyToken"], "r1");
        Ok(())
    }

    #[test]
    fn long_text_is_truncated_to_line_limit() {
        let OutgoingMessage::Text { text } = OutgoingMessage::text("あ".repeat(6000)) else {
            panic!("expected a text message");
        };
        assert_eq!(text.chars().count(), MAX_TEXT_CHARS);
    }
}
