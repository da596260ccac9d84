// Swipe session: owns the batch prefetcher, the blob store and the session state machine.

use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, info};

use super::item::{ImageHandle, ImageItem};
use super::prefetcher::Prefetcher;
use super::state::{Phase, SessionEffect, SessionEvent, SessionState};
use super::stats::{PrefetchStats, StatsSnapshot};
use super::store::BlobStore;
use crate::api::controls::Command;
use crate::config::EngineConfig;
use crate::report::share::{share_summary, ShareTarget};
use crate::report::summary::SessionSummary;
use crate::source::http_source::HttpSource;
use crate::source::traits::ImageSource;

pub struct SwipeSession {
    pub session_id: String,
    store: Arc<BlobStore>,
    stats: Arc<PrefetchStats>,
    prefetcher: Prefetcher,
    state: SessionState,
}

impl SwipeSession {
    pub fn new(session_id: String, config: &EngineConfig, source: Arc<dyn ImageSource>) -> Self {
        let store = Arc::new(BlobStore::new());
        let stats = Arc::new(PrefetchStats::new());
        let prefetcher = Prefetcher::new(source, store.clone(), stats.clone(), config);
        let state = SessionState::new(config, store.clone());

        info!(
            "session {} created: batch_size={} max_retries={}",
            session_id, config.batch_size, config.max_retries
        );

        Self {
            session_id,
            store,
            stats,
            prefetcher,
            state,
        }
    }

    /// Session backed by the configured HTTP image provider.
    pub fn with_http_source(session_id: String, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let source: Arc<dyn ImageSource> = Arc::new(HttpSource::from_config(config)?);
        Ok(Self::new(session_id, config, source))
    }

    /// Feed one event at the current time. Start and reset also run the batch prefetch.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        self.dispatch_at(event, Instant::now()).await
    }

    pub async fn dispatch_at(&mut self, event: SessionEvent, now: Instant) -> Vec<SessionEffect> {
        let mut effects = self.state.apply(event, now);

        let requested = effects.iter().find_map(|effect| match effect {
            SessionEffect::PrefetchRequested { count } => Some(*count),
            _ => None,
        });
        if let Some(count) = requested {
            let items = self.prefetcher.prefetch_batch(count).await;
            effects.extend(self.state.load(items));
        }
        effects
    }

    pub async fn start(&mut self) -> Vec<SessionEffect> {
        self.dispatch(SessionEvent::Start).await
    }

    /// Release the finished batch and prefetch a fresh one.
    pub async fn reset(&mut self) -> Vec<SessionEffect> {
        self.dispatch(SessionEvent::Reset).await
    }

    pub async fn command(&mut self, command: Command) -> Vec<SessionEffect> {
        debug!("session {} command {:?}", self.session_id, command);
        self.dispatch(command.to_event()).await
    }

    /// Wait out the settle delay, then report the new top card.
    pub async fn settle(&mut self) -> Option<SessionEffect> {
        let deadline = self.state.settle_deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.state.tick(Instant::now())
    }

    /// Non-blocking variant of [`settle`](Self::settle) for callers with their own frame loop.
    pub fn tick(&mut self) -> Option<SessionEffect> {
        self.state.tick(Instant::now())
    }

    /// Payload for rendering an item. `None` for fallbacks and released handles.
    pub fn payload(&self, item: &ImageItem) -> Option<Bytes> {
        match &item.handle {
            ImageHandle::Blob(handle) => self.store.get(handle),
            ImageHandle::Fallback(_) => None,
        }
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        if self.state.phase() != Phase::Complete {
            return None;
        }
        Some(SessionSummary::new(
            self.state.accepted().to_vec(),
            self.state.items().len(),
        ))
    }

    /// Share the results; feedback text only, session state is never touched.
    pub fn share_results(&self, target: &dyn ShareTarget, variant: usize) -> String {
        match self.summary() {
            Some(summary) => share_summary(target, &summary, variant),
            None => "No results to share yet".to_string(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop any outstanding retries; remaining slots resolve to fallbacks.
    pub fn shutdown(&self) {
        self.prefetcher.shutdown();
    }
}

impl Drop for SwipeSession {
    fn drop(&mut self) {
        debug!("SwipeSession {} dropped, releasing batch", self.session_id);
        self.prefetcher.shutdown();
        self.store.release_batch();
    }
}
