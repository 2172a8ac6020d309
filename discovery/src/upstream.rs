//! External collaborators the pipeline reads from: the photo listing and the
//! per-photo size probe.
use crate::types::Sol;
use async_trait::async_trait;

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("no photos found for sol {0}")]
    NoPhotos(Sol),

    #[error("http client error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("missing or invalid content length for {0}")]
    MissingContentLength(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Lists the candidate photo URLs for a sol, in the order the source returns them.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn list_photos(&self, sol: Sol) -> Result<Vec<String>, UpstreamError>;
}

/// Returns the byte size of the resource behind `url`.
#[async_trait]
pub trait SizeProber: Send + Sync {
    async fn size_of(&self, url: &str) -> Result<u64, UpstreamError>;
}
