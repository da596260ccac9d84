// Gesture classification: drag tracking, swipe triggers and visual feedback curves.

use tokio::time::Instant;

use crate::config::GestureConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Accept,
    Reject,
}

/// Directional pre-commit affordance shown once a drag passes the highlight threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Accept,
    Reject,
}

impl Highlight {
    pub fn color(&self) -> &'static str {
        match self {
            Highlight::Accept => "#10B981",
            Highlight::Reject => "#EF4444",
        }
    }
}

/// Transform the presentation layer applies to the top card during a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub rotate_deg: f64,
    pub opacity: f64,
    pub highlight: Option<Highlight>,
}

impl CardTransform {
    pub const IDENTITY: CardTransform = CardTransform {
        translate_x: 0.0,
        translate_y: 0.0,
        rotate_deg: 0.0,
        opacity: 1.0,
        highlight: None,
    };
}

/// Live pointer drag on the top card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub origin_x: f64,
    pub origin_y: f64,
    pub start_time: Instant,
    pub current_dx: f64,
    pub current_dy: f64,
}

impl DragState {
    pub fn begin(x: f64, y: f64, now: Instant) -> Self {
        Self {
            origin_x: x,
            origin_y: y,
            start_time: now,
            current_dx: 0.0,
            current_dy: 0.0,
        }
    }

    /// Record a pointer position and return the displacement from the origin.
    pub fn update(&mut self, x: f64, y: f64) -> (f64, f64) {
        self.current_dx = x - self.origin_x;
        self.current_dy = y - self.origin_y;
        (self.current_dx, self.current_dy)
    }

    pub fn elapsed_ms(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.start_time).as_micros() as f64 / 1000.0
    }
}

pub struct GestureClassifier {
    config: GestureConfig,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Rotation, opacity and highlight for a displacement. Pure; safe to call per input event.
    pub fn transform(&self, dx: f64, dy: f64) -> CardTransform {
        let opacity = (1.0 - dx.abs() / self.config.opacity_falloff_px).max(self.config.min_opacity);
        let highlight = if dx.abs() > self.config.highlight_threshold {
            Some(if dx > 0.0 {
                Highlight::Accept
            } else {
                Highlight::Reject
            })
        } else {
            None
        };

        CardTransform {
            translate_x: dx,
            translate_y: dy,
            rotate_deg: dx * self.config.rotation_deg_per_px,
            opacity,
            highlight,
        }
    }

    /// Classify a released drag. `None` means the card snaps back.
    ///
    /// Either trigger commits: `|dx|` above the distance threshold, or
    /// `|dx| / elapsed` above the velocity threshold. Elapsed time is floored
    /// at `min_elapsed_ms` so an instantaneous release cannot divide by zero,
    /// and the velocity trigger needs at least `min_velocity_displacement`.
    pub fn classify(&self, dx: f64, elapsed_ms: f64) -> Option<Outcome> {
        let elapsed = elapsed_ms.max(self.config.min_elapsed_ms);
        let velocity = dx.abs() / elapsed;

        let by_distance = dx.abs() > self.config.distance_threshold;
        let by_velocity = dx.abs() >= self.config.min_velocity_displacement
            && velocity > self.config.velocity_threshold;
        if !(by_distance || by_velocity) {
            return None;
        }

        if dx > 0.0 {
            Some(Outcome::Accept)
        } else {
            Some(Outcome::Reject)
        }
    }

    pub fn classify_release(&self, drag: &DragState, now: Instant) -> Option<Outcome> {
        self.classify(drag.current_dx, drag.elapsed_ms(now))
    }
}
