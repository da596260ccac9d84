use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Shown when a source has no remote placeholder of its own.
pub const PLACEHOLDER_DATA_URI: &str = "data:image/svg+xml;utf8,<svg width=\"400\" height=\"400\" xmlns=\"http://www.w3.org/2000/svg\"><rect width=\"100%\" height=\"100%\" fill=\"%23f3f4f6\"/><text x=\"50%\" y=\"50%\" font-family=\"Arial, sans-serif\" font-size=\"16\" fill=\"%2397a3b4\" text-anchor=\"middle\">Image not available</text></svg>";

/// One fetch cycle for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub slot: usize,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Millisecond timestamp taken when the request was built.
    pub timestamp_ms: i64,
    /// Unique per cycle; sources must forward it so responses are never served from cache.
    pub cache_buster: String,
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, request: &FetchRequest) -> Result<Bytes>;

    /// Static reference substituted when every attempt for `slot` failed.
    fn fallback_reference(&self, _slot: usize) -> String {
        PLACEHOLDER_DATA_URI.to_string()
    }
}
