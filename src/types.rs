//! Common types shared by the relay and its provider clients.

use mime::Mime;
use strum::{Display, EnumString, VariantNames};

/// Fallback content type when a provider does not report one.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Aspect ratios accepted by Imagen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, VariantNames, Display)]
#[strum(ascii_case_insensitive)]
pub enum AspectRatio {
    #[strum(serialize = "1:1")]
    OneToOne,
    #[strum(serialize = "3:4")]
    ThreeToFour,
    #[strum(serialize = "4:3")]
    FourToThree,
    #[strum(serialize = "9:16")]
    NineToSixteen,
    #[strum(serialize = "16:9")]
    SixteenToNine,
}

/// Raw image bytes plus the content type they were served or generated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// File extension for the content type,
    /// e.g. "image/png" -> "png", "image/jpeg" -> "jpg"
    #[must_use]
    pub fn extension(&self) -> &'static str {
        self.mime_type
            .parse::<Mime>()
            .ok()
            .filter(|mime| mime.type_() == mime::IMAGE)
            .and_then(|mime| match mime.subtype().as_str() {
                "jpeg" => Some("jpg"),
                _ => mime_guess::get_mime_extensions(&mime)
                    .and_then(|extensions| extensions.first().copied()),
            })
            .unwrap_or("png")
    }
}
