use std::{env, str::FromStr, time::Duration};

use log::{debug, error, info};
use strum::VariantNames;
use url::Url;

use crate::error::{RelayError, Result};
use crate::types::AspectRatio;

const DEFAULT_IMAGEN_MODEL: &str = "imagen-3.0-generate-002";
const DEFAULT_VISION_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_S3_REGION: &str = "auto";
const DEFAULT_S3_PREFIX: &str = "line-bot-images";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_CONTEXT_TTL_SECS: u64 = 600;
const DEFAULT_GENERATION_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_access_token: String,
    pub channel_secret: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: String,
    pub imagen_model: String,
    pub vision_model: String,
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub prefix: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub line: LineConfig,
    pub google: GoogleConfig,
    pub s3: S3Config,
    pub port: u16,
    pub context_ttl: Duration,
    pub generation_concurrency: usize,
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|e| {
        error!("Failed to load {name} from environment: {e}");
        RelayError::from(e)
    })
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            error!("Invalid value for {name}: '{raw}'");
            RelayError::Config(format!("{name} has an invalid value '{raw}'"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_aspect_ratio(raw: Option<String>) -> Result<Option<AspectRatio>> {
    raw.map(|raw| {
        raw.trim().parse::<AspectRatio>().map_err(|_| {
            RelayError::Config(format!(
                "Invalid aspect ratio '{}'. Supported: {}",
                raw,
                AspectRatio::VARIANTS.join(", ")
            ))
        })
    })
    .transpose()
}

fn validate_url(name: &str, raw: &str) -> Result<()> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|e| RelayError::Config(format!("{name} is not a valid URL: {e}")))
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is malformed.
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        let line = LineConfig {
            channel_access_token: required("LINE_CHANNEL_ACCESS_TOKEN")?,
            channel_secret: required("LINE_CHANNEL_SECRET")?,
        };

        let google = GoogleConfig {
            api_key: required("GOOGLE_API_KEY")?,
            imagen_model: optional("IMAGEN_MODEL", DEFAULT_IMAGEN_MODEL),
            vision_model: optional("VISION_MODEL", DEFAULT_VISION_MODEL),
            aspect_ratio: parse_aspect_ratio(env::var("IMAGE_ASPECT_RATIO").ok())?,
        };

        let s3 = S3Config {
            bucket: required("S3_BUCKET")?,
            region: optional("S3_REGION", DEFAULT_S3_REGION),
            endpoint: required("S3_ENDPOINT")?,
            prefix: optional("S3_PREFIX", DEFAULT_S3_PREFIX),
            public_base_url: required("S3_PUBLIC_BASE_URL")?,
        };
        validate_url("S3_ENDPOINT", &s3.endpoint)?;
        validate_url("S3_PUBLIC_BASE_URL", &s3.public_base_url)?;

        let port = parsed("PORT", DEFAULT_PORT)?;
        let context_ttl = Duration::from_secs(parsed("CONTEXT_TTL_SECS", DEFAULT_CONTEXT_TTL_SECS)?);
        let generation_concurrency =
            parsed("GENERATION_CONCURRENCY", DEFAULT_GENERATION_CONCURRENCY)?;
        if generation_concurrency == 0 {
            return Err(RelayError::Config(
                "GENERATION_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        info!("Configuration loaded successfully");
        debug!(
            "LINE access token length: {} characters",
            line.channel_access_token.len()
        );
        debug!("Google API key length: {} characters", google.api_key.len());
        debug!(
            "Imagen model: {}, vision model: {}",
            google.imagen_model, google.vision_model
        );
        debug!("S3 target: s3://{}/{}", s3.bucket, s3.prefix);
        debug!(
            "Port: {port}, context TTL: {}s, concurrency: {generation_concurrency}",
            context_ttl.as_secs()
        );

        Ok(Self {
            line,
            google,
            s3,
            port,
            context_ttl,
            generation_concurrency,
        })
    }
}
