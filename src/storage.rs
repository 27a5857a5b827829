//! S3-backed hosting for generated images.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client, primitives::ByteStream};
use chrono::{DateTime, Utc};
use log::info;

use crate::{config::S3Config, error::Result, relay::ImageHost, types::ImageData};

/// Uploads images under a fixed prefix and serves them from a public base URL.
#[derive(Debug)]
pub struct S3ImageStore {
    client: Client,
    bucket: String,
    prefix: String,
    public_base_url: String,
}

impl S3ImageStore {
    /// Build a new image store from configuration.
    pub async fn from_config(config: &S3Config) -> Self {
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .load()
            .await;

        Self {
            client: Client::new(&shared_config),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        public_url(&self.public_base_url, key)
    }
}

/// Object key `{prefix}/{timestamp}-{random}.{ext}`; every upload gets a fresh object.
fn object_key(prefix: &str, image: &ImageData, now: DateTime<Utc>, suffix: u32) -> String {
    let name = format!(
        "{}-{suffix:08x}.{}",
        now.format("%Y%m%d%H%M%S%3f"),
        image.extension()
    );
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

impl ImageHost for S3ImageStore {
    async fn upload(&self, image: &ImageData) -> Result<String> {
        let key = object_key(&self.prefix, image, Utc::now(), rand::random());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&image.mime_type)
            .body(ByteStream::from(image.bytes.clone()))
            .send()
            .await?;

        let url = self.public_url(&key);
        info!(
            "Uploaded {} bytes to s3://{}/{key}",
            image.bytes.len(),
            self.bucket
        );
        Ok(url)
    }
}
