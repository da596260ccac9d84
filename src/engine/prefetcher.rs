// Batch prefetcher: resolves N slots concurrently, each with bounded retries and a fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::item::ImageItem;
use super::stats::PrefetchStats;
use super::store::BlobStore;
use crate::config::EngineConfig;
use crate::detect::image_format::{validate_image, ValidationError};
use crate::source::traits::{FetchRequest, ImageSource};

/// Why a single fetch-and-validate cycle failed. Never escapes the prefetcher.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("fetch failed: {0}")]
    Fetch(anyhow::Error),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
}

pub struct Prefetcher {
    source: Arc<dyn ImageSource>,
    store: Arc<BlobStore>,
    stats: Arc<PrefetchStats>,
    shutdown_token: CancellationToken,
    nonce: AtomicU64,
    max_retries: u32,
    backoff_step: Duration,
    attempt_timeout: Duration,
}

impl Prefetcher {
    pub fn new(
        source: Arc<dyn ImageSource>,
        store: Arc<BlobStore>,
        stats: Arc<PrefetchStats>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            source,
            store,
            stats,
            shutdown_token: CancellationToken::new(),
            nonce: AtomicU64::new(0),
            max_retries: config.max_retries,
            backoff_step: Duration::from_millis(config.backoff_step_ms),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }

    /// Stop retrying: outstanding slots resolve to their fallback at the next check.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Resolve `count` slots concurrently. Always yields exactly `count` items, ordered by slot.
    ///
    /// Starts a new generation in the blob store, so every handle of the
    /// previous batch is released before the first slot is fetched.
    pub async fn prefetch_batch(&self, count: usize) -> Vec<ImageItem> {
        let t0 = Instant::now();
        let generation = self.store.begin_batch(count);
        info!(
            "prefetching batch of {} slots (generation {})",
            count, generation
        );

        let items = join_all((0..count).map(|slot| self.resolve_slot(slot))).await;

        let fallbacks = items.iter().filter(|item| item.is_fallback).count();
        info!(
            "batch resolved: {} slots, {} fallbacks, elapsed_ms={}",
            count,
            fallbacks,
            t0.elapsed().as_millis()
        );
        items
    }

    async fn resolve_slot(&self, slot: usize) -> ImageItem {
        self.stats.increment_workers();
        let fetched = self.fetch_with_retry(slot).await;
        self.stats.decrement_workers();

        if let Some(data) = fetched {
            let len = data.len() as u64;
            match self.store.put(slot, data) {
                Ok(handle) => {
                    self.stats.record_success(len);
                    return ImageItem::fetched(slot, handle);
                }
                Err(e) => warn!("slot {} could not be stored: {}", slot, e),
            }
        }

        self.stats.record_fallback();
        ImageItem::fallback(slot, self.source.fallback_reference(slot))
    }

    async fn fetch_with_retry(&self, slot: usize) -> Option<Bytes> {
        for attempt in 1..=self.max_retries {
            if self.shutdown_token.is_cancelled() {
                debug!("slot {} skipped: shutdown in progress", slot);
                return None;
            }

            let request = self.next_request(slot, attempt);
            self.stats.record_attempt();

            match self.run_attempt(&request).await {
                Ok(data) => {
                    debug!(
                        "slot {} resolved on attempt {} ({} bytes)",
                        slot,
                        attempt,
                        data.len()
                    );
                    return Some(data);
                }
                Err(e) => {
                    match &e {
                        AttemptError::Fetch(_) => self.stats.record_fetch_failure(),
                        AttemptError::Validation(_) => self.stats.record_validation_failure(),
                        AttemptError::Timeout(_) => self.stats.record_timeout(),
                    }
                    warn!("slot {} attempt {} failed: {}", slot, attempt, e);

                    if attempt < self.max_retries {
                        let delay = self.backoff_step * attempt;
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = self.shutdown_token.cancelled() => {
                                debug!("slot {} backoff interrupted by shutdown", slot);
                                return None;
                            }
                        }
                    }
                }
            }
        }

        warn!(
            "slot {} exhausted {} attempts, using fallback",
            slot, self.max_retries
        );
        None
    }

    /// One fetch-and-validate cycle bounded by the attempt timeout.
    ///
    /// The decode runs on the blocking pool so the timeout can fire while it
    /// is in progress and sibling slots keep decoding concurrently.
    async fn run_attempt(&self, request: &FetchRequest) -> Result<Bytes, AttemptError> {
        let cycle = async {
            let data = self
                .source
                .fetch_image(request)
                .await
                .map_err(AttemptError::Fetch)?;
            let payload = data.clone();
            tokio::task::spawn_blocking(move || validate_image(&payload))
                .await
                .map_err(|e| ValidationError::Decode(format!("decode task failed: {}", e)))??;
            Ok::<_, AttemptError>(data)
        };

        match tokio::time::timeout(self.attempt_timeout, cycle).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout(self.attempt_timeout)),
        }
    }

    fn next_request(&self, slot: usize, attempt: u32) -> FetchRequest {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let timestamp_ms = Utc::now().timestamp_millis();
        FetchRequest {
            slot,
            attempt,
            timestamp_ms,
            cache_buster: format!("{:x}-{}-{}-{}", timestamp_ms, slot, attempt, nonce),
        }
    }
}
