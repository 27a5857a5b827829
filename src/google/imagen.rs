//! Imagen `:predict` request and response bodies.

use base64::{Engine, engine::general_purpose::STANDARD};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::types::{AspectRatio, DEFAULT_IMAGE_MIME, ImageData};

#[derive(Debug, Serialize)]
pub struct PredictRequest {
    instances: Vec<Instance>,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Instance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    sample_count: u32,
    include_rai_reason: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
}

impl PredictRequest {
    /// One image for `prompt`.
    pub fn new(prompt: &str, aspect_ratio: Option<AspectRatio>) -> Self {
        Self {
            instances: vec![Instance {
                prompt: prompt.to_string(),
            }],
            parameters: Parameters {
                sample_count: 1,
                include_rai_reason: true,
                aspect_ratio: aspect_ratio.map(|ratio| ratio.to_string()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
    rai_filtered_reason: Option<String>,
}

/// Decode the first generated image.
pub fn extract_image(response: PredictResponse) -> Result<ImageData> {
    let Some(prediction) = response.predictions.into_iter().next() else {
        return Err(RelayError::GoogleResponse("No image was generated".into()));
    };

    let Some(encoded) = prediction.bytes_base64_encoded else {
        let reason = prediction
            .rai_filtered_reason
            .unwrap_or_else(|| "no image data in prediction".to_string());
        return Err(RelayError::GoogleResponse(format!(
            "Image was filtered: {reason}"
        )));
    };

    let bytes = STANDARD.decode(encoded)?;
    let mime_type = prediction
        .mime_type
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
    debug!("Decoded generated image: {} bytes, {mime_type}", bytes.len());
    Ok(ImageData::new(bytes, mime_type))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(value: serde_json::Value) -> PredictResponse {
        serde_json::from_value(value).unwrap_or(PredictResponse {
            predictions: Vec::new(),
        })
    }

    #[test]
    fn request_matches_predict_shape() -> serde_json::Result<()> {
        let body = serde_json::to_value(PredictRequest::new(
            "a cat",
            Some(AspectRatio::SixteenToNine),
        ))?;
        assert_eq!(
            body,
            json!({
                "instances": [{"prompt": "a cat"}],
                "parameters": {"sampleCount": 1, "includeRaiReason": true, "aspectRatio": "16:9"}
            })
        );
        Ok(())
    }

    #[test]
    fn aspect_ratio_is_omitted_when_unset() -> serde_json::Result<()> {
        let body = serde_json::to_value(PredictRequest::new("a cat", None))?;
        assert!(body["parameters"].get("aspectRatio").is_none());
        Ok(())
    }

    #[test]
    fn decodes_first_prediction() -> Result<()> {
        let image = extract_image(response(json!({
            "predictions": [
                {"bytesBase64Encoded": STANDARD.encode([1u8, 2, 3]), "mimeType": "image/png"}
            ]
        })))?;
        assert_eq!(image, ImageData::new(vec![1, 2, 3], "image/png"));
        Ok(())
    }

    #[test]
    fn empty_predictions_mean_no_image() {
        let err = extract_image(response(json!({}))).err();
        assert!(matches!(err, Some(RelayError::GoogleResponse(m)) if m.contains("No image")));
    }

    #[test]
    fn filtered_prediction_reports_reason() {
        let err = extract_image(response(json!({
            "predictions": [{"raiFilteredReason": "blocked by safety filter"}]
        })))
        .err();
        assert!(matches!(err, Some(RelayError::GoogleResponse(m)) if m.contains("safety")));
    }
}
