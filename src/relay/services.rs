//! The external collaborators the relay talks to.

use std::future::Future;

use crate::error::Result;
use crate::line::OutgoingMessage;
use crate::types::ImageData;

/// Turns prompts into images and images into descriptions.
pub trait ImageGenerator: Send + Sync + 'static {
    /// Text-to-image generation.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<ImageData>> + Send;

    /// Describe a reference image so it can be folded into a prompt.
    fn describe(&self, image: &ImageData) -> impl Future<Output = Result<String>> + Send;
}

/// Publishes image bytes and returns a public HTTPS URL.
pub trait ImageHost: Send + Sync + 'static {
    fn upload(&self, image: &ImageData) -> impl Future<Output = Result<String>> + Send;
}

/// The chat transport.
pub trait Messenger: Send + Sync + 'static {
    fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutgoingMessage>,
    ) -> impl Future<Output = Result<()>> + Send;

    fn push(
        &self,
        to: &str,
        messages: Vec<OutgoingMessage>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Download the bytes of an image message hosted by the platform.
    fn fetch_content(&self, message_id: &str) -> impl Future<Output = Result<ImageData>> + Send;

    /// Download an image a user sent by URL.
    fn fetch_external(&self, url: &str) -> impl Future<Output = Result<ImageData>> + Send;
}
