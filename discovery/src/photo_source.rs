use crate::config::PhotoSource as PhotoSourceConfig;
use crate::types::Sol;
use crate::upstream::{PhotoSource, UpstreamError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Deserialize)]
struct NasaPhoto {
    img_src: String,
}

#[derive(Deserialize)]
struct NasaPhotos {
    photos: Vec<NasaPhoto>,
}

/// Lists rover photos from the NASA Mars photos API.
pub struct NasaPhotoSource {
    client: reqwest::Client,
    url: Url,
    api_key: String,
}

impl NasaPhotoSource {
    pub fn new(config: &PhotoSourceConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(NasaPhotoSource {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn build_url(&self, sol: Sol) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("sol", &sol.to_string())
            .append_pair("api_key", &self.api_key);
        url
    }
}

#[async_trait]
impl PhotoSource for NasaPhotoSource {
    async fn list_photos(&self, sol: Sol) -> Result<Vec<String>, UpstreamError> {
        // Never log the api key
        let mut redacted = self.url.clone();
        redacted.set_query(Some(&format!("sol={sol}")));
        let redact = |e: reqwest::Error| UpstreamError::Request(e.with_url(redacted.clone()));

        let response = self
            .client
            .get(self.build_url(sol))
            .send()
            .await
            .map_err(redact)?;

        if !response.status().is_success() {
            return Err(UpstreamError::UnexpectedStatus {
                url: redacted.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.json::<NasaPhotos>().await.map_err(redact)?;
        if body.photos.is_empty() {
            return Err(UpstreamError::NoPhotos(sol));
        }

        tracing::debug!(%sol, count = body.photos.len(), "Fetched photo list");
        Ok(body.photos.into_iter().map(|p| p.img_src).collect())
    }
}
