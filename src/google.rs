//! Google Generative Language API: Imagen for generation, Gemini for vision.

mod imagen;
mod vision;

use log::debug;
use reqwest::{Client, Response};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::GoogleConfig;
use crate::error::{RelayError, Result};
use crate::relay::ImageGenerator;
use crate::types::{AspectRatio, ImageData};

const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleClient {
    api_key: String,
    client: Client,
    api_base: String,
    imagen_model: String,
    vision_model: String,
    aspect_ratio: Option<AspectRatio>,
}

impl GoogleClient {
    pub fn new(config: &GoogleConfig, client: Client) -> Self {
        Self {
            api_key: config.api_key.clone(),
            client,
            api_base: GOOGLE_API_BASE.to_string(),
            imagen_model: config.imagen_model.clone(),
            vision_model: config.vision_model.clone(),
            aspect_ratio: config.aspect_ratio,
        }
    }

    /// POST `body` to `models/{model}:{method}` and decode the JSON response.
    async fn call<B, R>(&self, model: &str, method: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/models/{model}:{method}", self.api_base);
        debug!("Calling Google AI {model}:{method}");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
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
    Err(RelayError::GoogleApi { status, message })
}

impl ImageGenerator for GoogleClient {
    async fn generate(&self, prompt: &str) -> Result<ImageData> {
        let request = imagen::PredictRequest::new(prompt, self.aspect_ratio);
        let response: imagen::PredictResponse =
            self.call(&self.imagen_model, "predict", &request).await?;
        imagen::extract_image(response)
    }

    async fn describe(&self, image: &ImageData) -> Result<String> {
        let request = vision::GenerateContentRequest::describe(image);
        let response: vision::GenerateContentResponse = self
            .call(&self.vision_model, "generateContent", &request)
            .await?;
        vision::extract_text(&response)
    }
}
