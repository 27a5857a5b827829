//! Gemini `:generateContent` used to describe a reference image.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::types::ImageData;

const DESCRIBE_INSTRUCTION: &str = "Describe this image in detail so that an image generation \
model could recreate it: subjects, composition, colors, lighting and style. \
Answer in English with a single paragraph.";

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentRequest {
    pub fn describe(image: &ImageData) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: STANDARD.encode(&image.bytes),
                        },
                    },
                    RequestPart::Text {
                        text: DESCRIBE_INSTRUCTION.to_string(),
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Join the text parts of the first candidate.
pub fn extract_text(response: &GenerateContentResponse) -> Result<String> {
    let text = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(RelayError::GoogleResponse(
            "Vision model returned no description".into(),
        ));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_sends_image_before_instruction() -> serde_json::Result<()> {
        let image = ImageData::new(vec![0xff, 0xd8], "image/jpeg");
        let body = serde_json::to_value(GenerateContentRequest::describe(&image))?;

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], STANDARD.encode([0xff, 0xd8]));
        assert!(parts[1]["text"].is_string());
        Ok(())
    }

    #[test]
    fn joins_text_parts() -> Result<()> {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "A fox in snow."},
                {"text": "Soft morning light."}
            ]}}]
        }))?;
        assert_eq!(extract_text(&response)?, "A fox in snow.\nSoft morning light.");
        Ok(())
    }

    #[test]
    fn blocked_candidate_is_an_error() -> Result<()> {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))?;
        assert!(extract_text(&response).is_err());
        Ok(())
    }
}
