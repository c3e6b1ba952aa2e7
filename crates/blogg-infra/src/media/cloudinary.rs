//! Cloudinary unsigned-upload client.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use uuid::Uuid;

use blogg_core::ports::{ImageHost, ImageHostError};

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub upload_preset: String,
    /// Overrides `https://api.cloudinary.com`; used to point at a stub.
    pub api_base: String,
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        upload_preset: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            upload_preset: upload_preset.into(),
            api_base: "https://api.cloudinary.com".to_string(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.api_base.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

impl UploadResponse {
    fn into_url(self) -> Option<String> {
        self.secure_url.or(self.url)
    }
}

const MAX_STEM_LEN: usize = 40;

/// Server-generated public id: a fresh UUID plus a slug of the client's
/// file stem. Path separators and dot segments never reach Cloudinary.
fn public_id(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let slug: String = stem
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            '-' | '_' | ' ' => Some('-'),
            _ => None,
        })
        .take(MAX_STEM_LEN)
        .collect();
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}-{}", Uuid::new_v4(), slug)
    }
}

pub struct CloudinaryImageHost {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

impl CloudinaryImageHost {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ImageHost for CloudinaryImageHost {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, ImageHostError> {
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new()
            .part("file", part)
            .text("public_id", public_id(filename))
            .text("upload_preset", self.config.upload_preset.clone())
            .text("api_key", self.config.api_key.clone());

        let url = self.config.upload_url();
        tracing::debug!(url = %url, filename, size, "Uploading image to Cloudinary");

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageHostError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(ImageHostError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageHostError::Response(e.to_string()))?;

        let url = upload
            .into_url()
            .ok_or_else(|| ImageHostError::Response("missing url in response".to_string()))?;

        tracing::info!(url = %url, "Image uploaded");
        Ok(url)
    }
}
