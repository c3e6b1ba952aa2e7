//! Image hosting port.

use async_trait::async_trait;

/// Uploads binary images to a third-party host.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload `bytes` and return the publicly reachable URL.
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, ImageHostError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ImageHostError {
    #[error("Upload request failed: {0}")]
    Request(String),

    #[error("Host rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Response(String),
}
