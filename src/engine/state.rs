// Session state machine: cursor, accepted list and live drag, driven by discrete events.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use super::gesture::{CardTransform, DragState, GestureClassifier, Outcome};
use super::item::ImageItem;
use super::store::BlobStore;
use crate::config::EngineConfig;
use crate::report::summary::SessionSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Prefetching,
    Active,
    Complete,
}

/// Input to the state machine. Pointer coordinates are in presentation pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    Start,
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    PointerCancel,
    Decide(Outcome),
    Reset,
}

/// Output for the presentation and report collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// A batch of `count` items must be prefetched and handed to [`SessionState::load`].
    PrefetchRequested { count: usize },
    /// Handles of the previous batch were freed.
    Released { count: usize },
    Transform {
        item_id: usize,
        transform: CardTransform,
    },
    SnapBack { item_id: usize },
    Exited { item_id: usize, outcome: Outcome },
    /// The item became the interactive top card.
    Entered { item_id: usize },
    Completed(SessionSummary),
}

/// One card of the visible stack, top card first.
#[derive(Debug, Clone, PartialEq)]
pub struct StackCard<'a> {
    pub item: &'a ImageItem,
    pub scale: f64,
    pub offset_y: f64,
    pub z_index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based position of the top card, capped at `total`.
    pub current: usize,
    pub total: usize,
    pub accepted: usize,
}

pub struct SessionState {
    phase: Phase,
    items: Vec<ImageItem>,
    cursor: usize,
    accepted: Vec<ImageItem>,
    drag: Option<DragState>,
    settle_until: Option<Instant>,
    summary_emitted: bool,
    batch_size: usize,
    settle_delay: Duration,
    stack_depth: usize,
    classifier: GestureClassifier,
    store: Arc<BlobStore>,
}

impl SessionState {
    pub fn new(config: &EngineConfig, store: Arc<BlobStore>) -> Self {
        Self {
            phase: Phase::Idle,
            items: Vec::new(),
            cursor: 0,
            accepted: Vec::new(),
            drag: None,
            settle_until: None,
            summary_emitted: false,
            batch_size: config.batch_size,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            stack_depth: config.stack_depth,
            classifier: GestureClassifier::new(config.gesture.clone()),
            store,
        }
    }

    /// Apply one event. Events that are invalid in the current phase are ignored.
    pub fn apply(&mut self, event: SessionEvent, now: Instant) -> Vec<SessionEffect> {
        match event {
            SessionEvent::Start => self.start(),
            SessionEvent::PointerDown { x, y } => {
                self.pointer_down(x, y, now);
                Vec::new()
            }
            SessionEvent::PointerMove { x, y } => self.pointer_move(x, y).into_iter().collect(),
            SessionEvent::PointerUp | SessionEvent::PointerCancel => self.pointer_release(now),
            SessionEvent::Decide(outcome) => self.decide(outcome, now),
            SessionEvent::Reset => self.reset(),
        }
    }

    /// Hand the prefetched batch to the session.
    pub fn load(&mut self, items: Vec<ImageItem>) -> Vec<SessionEffect> {
        if self.phase != Phase::Prefetching {
            debug!("load ignored in phase {:?}", self.phase);
            return Vec::new();
        }

        info!("session loaded {} items", items.len());
        self.items = items;
        self.cursor = 0;
        self.phase = Phase::Active;

        match self.items.first().map(|first| first.id) {
            Some(item_id) => vec![SessionEffect::Entered { item_id }],
            None => self.complete().into_iter().collect(),
        }
    }

    /// Report the next top card once the settle delay has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<SessionEffect> {
        let deadline = self.settle_until?;
        if now < deadline {
            return None;
        }
        self.settle_until = None;
        if self.phase != Phase::Active {
            return None;
        }
        self.current_item()
            .map(|item| SessionEffect::Entered { item_id: item.id })
    }

    fn start(&mut self) -> Vec<SessionEffect> {
        if self.phase != Phase::Idle {
            debug!("start ignored in phase {:?}", self.phase);
            return Vec::new();
        }
        self.phase = Phase::Prefetching;
        vec![SessionEffect::PrefetchRequested {
            count: self.batch_size,
        }]
    }

    fn reset(&mut self) -> Vec<SessionEffect> {
        if self.phase != Phase::Complete {
            debug!("reset ignored in phase {:?}", self.phase);
            return Vec::new();
        }

        let released = self.store.release_batch();
        self.items.clear();
        self.accepted.clear();
        self.cursor = 0;
        self.drag = None;
        self.settle_until = None;
        self.summary_emitted = false;
        self.phase = Phase::Idle;
        info!("session reset, released {} handles", released);

        let mut effects = vec![SessionEffect::Released { count: released }];
        effects.extend(self.start());
        effects
    }

    fn pointer_down(&mut self, x: f64, y: f64, now: Instant) {
        if self.phase != Phase::Active || self.is_settling(now) || self.drag.is_some() {
            return;
        }
        if self.current_item().is_none() {
            return;
        }
        self.drag = Some(DragState::begin(x, y, now));
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Option<SessionEffect> {
        let item_id = self.current_item()?.id;
        let drag = self.drag.as_mut()?;
        let (dx, dy) = drag.update(x, y);
        Some(SessionEffect::Transform {
            item_id,
            transform: self.classifier.transform(dx, dy),
        })
    }

    fn pointer_release(&mut self, now: Instant) -> Vec<SessionEffect> {
        let Some(drag) = self.drag.take() else {
            return Vec::new();
        };

        match self.classifier.classify_release(&drag, now) {
            Some(outcome) => self.decide(outcome, now),
            None => self
                .current_item()
                .map(|item| SessionEffect::SnapBack { item_id: item.id })
                .into_iter()
                .collect(),
        }
    }

    fn decide(&mut self, outcome: Outcome, now: Instant) -> Vec<SessionEffect> {
        if self.phase != Phase::Active {
            debug!("decision {:?} ignored in phase {:?}", outcome, self.phase);
            return Vec::new();
        }
        if self.is_settling(now) {
            debug!("decision {:?} dropped inside settle window", outcome);
            return Vec::new();
        }
        let Some(item) = self.items.get(self.cursor).cloned() else {
            return Vec::new();
        };

        debug!("item {} decided {:?}", item.id, outcome);
        let item_id = item.id;
        if outcome == Outcome::Accept {
            self.accepted.push(item);
        }
        self.cursor += 1;
        self.drag = None;
        self.settle_until = Some(now + self.settle_delay);

        let mut effects = vec![SessionEffect::Exited { item_id, outcome }];
        if self.cursor == self.items.len() {
            effects.extend(self.complete());
        }
        effects
    }

    fn complete(&mut self) -> Option<SessionEffect> {
        self.phase = Phase::Complete;
        if self.summary_emitted {
            return None;
        }
        self.summary_emitted = true;
        let summary = SessionSummary::new(self.accepted.clone(), self.items.len());
        info!(
            "session complete: accepted {} of {}",
            summary.accepted_count, summary.total_count
        );
        Some(SessionEffect::Completed(summary))
    }

    pub fn is_settling(&self, now: Instant) -> bool {
        self.settle_until.map(|deadline| now < deadline).unwrap_or(false)
    }

    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle_until
    }

    /// Up to `stack_depth` cards starting at the cursor.
    pub fn visible_stack(&self) -> Vec<StackCard<'_>> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        self.items
            .iter()
            .skip(self.cursor)
            .take(self.stack_depth)
            .enumerate()
            .map(|(i, item)| StackCard {
                item,
                scale: 1.0 - i as f64 * 0.05,
                offset_y: i as f64 * 10.0,
                z_index: 10 - i as i32,
            })
            .collect()
    }

    pub fn progress(&self) -> Progress {
        let total = self.items.len();
        Progress {
            current: (self.cursor + 1).min(total),
            total,
            accepted: self.accepted.len(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn accepted(&self) -> &[ImageItem] {
        &self.accepted
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn current_item(&self) -> Option<&ImageItem> {
        if self.phase != Phase::Active {
            return None;
        }
        self.items.get(self.cursor)
    }
}
