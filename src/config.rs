use anyhow::{anyhow, Result};
use serde::Deserialize;

/// Number of cards in one session.
pub const DEFAULT_BATCH_SIZE: usize = 15;

/// Fetch-and-validate cycles per slot before falling back.
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Linear backoff step; attempt `n` failing waits `n * step` before attempt `n + 1`.
pub const BACKOFF_STEP_MS: u64 = 1000;

/// Upper bound on a single fetch-and-validate cycle.
pub const ATTEMPT_TIMEOUT_MS: u64 = 5000;

/// Pause after a decision while the exit animation runs.
pub const SETTLE_DELAY_MS: u64 = 500;

/// Cards rendered behind (and including) the top card.
pub const STACK_DEPTH: usize = 3;

/// Horizontal displacement (px) that commits a swipe.
pub const SWIPE_DISTANCE_THRESHOLD: f64 = 100.0;

/// Displacement rate (px/ms) that commits a swipe regardless of distance.
pub const SWIPE_VELOCITY_THRESHOLD: f64 = 0.5;

/// Floor on elapsed drag time used by the velocity trigger (one 60Hz frame).
pub const MIN_GESTURE_ELAPSED_MS: f64 = 16.0;

/// Displacement (px) a release must cover before the velocity trigger applies.
pub const MIN_VELOCITY_DISPLACEMENT: f64 = 10.0;

/// Remote image provider.
pub const DEFAULT_SOURCE_URL: &str = "https://cataas.com/cat";

/// Top-level configuration for the swipe engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of images fetched per session.
    pub batch_size: usize,
    /// Fetch-and-validate cycles per slot.
    pub max_retries: u32,
    /// Backoff step in milliseconds.
    pub backoff_step_ms: u64,
    /// Timeout for one fetch-and-validate cycle.
    pub attempt_timeout_ms: u64,
    /// Settle delay after each decision.
    pub settle_delay_ms: u64,
    /// Visible stack depth.
    pub stack_depth: usize,
    /// Base URL of the image provider.
    pub source_url: String,
    pub image_width: u32,
    pub image_height: u32,
    /// Transport-level timeout for the HTTP client.
    pub request_timeout_ms: u64,
    pub gesture: GestureConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: MAX_FETCH_ATTEMPTS,
            backoff_step_ms: BACKOFF_STEP_MS,
            attempt_timeout_ms: ATTEMPT_TIMEOUT_MS,
            settle_delay_ms: SETTLE_DELAY_MS,
            stack_depth: STACK_DEPTH,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            image_width: 400,
            image_height: 400,
            request_timeout_ms: 10_000,
            gesture: GestureConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| anyhow!("invalid engine config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.attempt_timeout_ms == 0 {
            return Err(anyhow!("attempt_timeout_ms must be > 0"));
        }
        if self.stack_depth == 0 {
            return Err(anyhow!("stack_depth must be > 0"));
        }
        if self.source_url.trim().is_empty() {
            return Err(anyhow!("source_url must not be empty"));
        }
        self.gesture.validate()
    }
}

/// Thresholds and visual-feedback curves for drag classification.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub distance_threshold: f64,
    pub velocity_threshold: f64,
    /// |dx| beyond which the directional highlight is shown.
    pub highlight_threshold: f64,
    pub min_elapsed_ms: f64,
    /// Velocity commits only once |dx| reaches this, so a jittery tap released
    /// inside the elapsed floor snaps back instead of committing.
    pub min_velocity_displacement: f64,
    pub rotation_deg_per_px: f64,
    pub min_opacity: f64,
    pub opacity_falloff_px: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            distance_threshold: SWIPE_DISTANCE_THRESHOLD,
            velocity_threshold: SWIPE_VELOCITY_THRESHOLD,
            highlight_threshold: SWIPE_DISTANCE_THRESHOLD,
            min_elapsed_ms: MIN_GESTURE_ELAPSED_MS,
            min_velocity_displacement: MIN_VELOCITY_DISPLACEMENT,
            rotation_deg_per_px: 0.1,
            min_opacity: 0.7,
            opacity_falloff_px: 300.0,
        }
    }
}

impl GestureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.distance_threshold <= 0.0 {
            return Err(anyhow!("distance_threshold must be > 0"));
        }
        if self.velocity_threshold <= 0.0 {
            return Err(anyhow!("velocity_threshold must be > 0"));
        }
        if self.min_elapsed_ms <= 0.0 {
            return Err(anyhow!("min_elapsed_ms must be > 0"));
        }
        if self.min_velocity_displacement < 0.0 {
            return Err(anyhow!("min_velocity_displacement must be >= 0"));
        }
        if self.opacity_falloff_px <= 0.0 {
            return Err(anyhow!("opacity_falloff_px must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.min_opacity) {
            return Err(anyhow!("min_opacity must be within [0, 1]"));
        }
        Ok(())
    }
}
