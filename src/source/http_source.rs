use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, RequestBuilder, Url};
use tracing::debug;

use super::traits::{FetchRequest, ImageSource};
use crate::config::EngineConfig;

/// Fetches images from an HTTP provider that returns a random image per request.
pub struct HttpSource {
    client: Client,
    base_url: Url,
    width: u32,
    height: u32,
}

impl HttpSource {
    pub fn new(base_url: &str, width: u32, height: u32, request_timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| anyhow!("invalid source url {}: {}", base_url, e))?;
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url,
            width,
            height,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(
            &config.source_url,
            config.image_width,
            config.image_height,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// URL for one fetch cycle: size plus the `t`/`r` cache-busting pair.
    pub fn request_url(&self, request: &FetchRequest) -> Url {
        let mut url = self.sized_url();
        url.query_pairs_mut()
            .append_pair("t", &request.timestamp_ms.to_string())
            .append_pair("r", &request.cache_buster);
        url
    }

    fn sized_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("width", &self.width.to_string())
            .append_pair("height", &self.height.to_string());
        url
    }

    fn build_request(&self, url: Url) -> RequestBuilder {
        self.client
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
    }
}

#[async_trait]
impl ImageSource for HttpSource {
    async fn fetch_image(&self, request: &FetchRequest) -> Result<Bytes> {
        let url = self.request_url(request);
        debug!(
            "http fetch slot={} attempt={} url={}",
            request.slot, request.attempt, url
        );
        let resp = self.build_request(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            debug!(
                "http fetch failed status={} slot={} attempt={}",
                status.as_u16(),
                request.slot,
                request.attempt
            );
            return Err(anyhow!("fetch_image failed: HTTP {}", status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(anyhow!("fetch_image returned an empty body"));
        }
        Ok(bytes)
    }

    fn fallback_reference(&self, slot: usize) -> String {
        let mut url = self.sized_url();
        url.query_pairs_mut()
            .append_pair("fallback", &slot.to_string());
        url.to_string()
    }
}
