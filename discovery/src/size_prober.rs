use crate::upstream::{SizeProber, UpstreamError};
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use std::time::Duration;

/// Probes a photo's size with a HEAD request and reads `Content-Length`.
#[derive(Clone)]
pub struct HttpSizeProber {
    client: reqwest::Client,
}

impl HttpSizeProber {
    pub fn new(timeout_secs: u64) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(HttpSizeProber { client })
    }
}

#[async_trait]
impl SizeProber for HttpSizeProber {
    async fn size_of(&self, url: &str) -> Result<u64, UpstreamError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{url}: {e}")))?;
        let response = self.client.head(parsed).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        // The header is read directly; the body of a HEAD response is always empty
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .ok_or_else(|| UpstreamError::MissingContentLength(url.to_string()))
    }
}
