use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use tokio::time::Instant;

use swipe_deck_engine::api::controls::Command;
use swipe_deck_engine::config::EngineConfig;
use swipe_deck_engine::engine::gesture::Outcome;
use swipe_deck_engine::engine::session::SwipeSession;
use swipe_deck_engine::engine::state::{Phase, SessionEffect, SessionEvent};
use swipe_deck_engine::report::share::{ShareError, ShareMethod, ShareTarget};
use swipe_deck_engine::source::traits::{FetchRequest, ImageSource};

struct PngSource {
    png: Bytes,
    healthy: bool,
}

#[async_trait]
impl ImageSource for PngSource {
    async fn fetch_image(&self, _request: &FetchRequest) -> Result<Bytes> {
        if self.healthy {
            Ok(self.png.clone())
        } else {
            Err(anyhow!("network unreachable"))
        }
    }
}

fn png_bytes() -> Bytes {
    let img = RgbImage::from_pixel(2, 2, Rgb([10, 200, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

fn session(batch_size: usize, healthy: bool) -> SwipeSession {
    let config = EngineConfig {
        batch_size,
        ..EngineConfig::default()
    };
    let source = Arc::new(PngSource {
        png: png_bytes(),
        healthy,
    });
    SwipeSession::new("test-session".to_string(), &config, source)
}

fn ms(t0: Instant, millis: u64) -> Instant {
    t0 + Duration::from_millis(millis)
}

/// Drag from (0, 0) to (dx, 0) over `duration_ms`, released at the end.
async fn swipe(
    session: &mut SwipeSession,
    start: Instant,
    dx: f64,
    duration_ms: u64,
) -> Vec<SessionEffect> {
    let mut effects = session
        .dispatch_at(SessionEvent::PointerDown { x: 0.0, y: 0.0 }, start)
        .await;
    effects.extend(
        session
            .dispatch_at(SessionEvent::PointerMove { x: dx, y: 0.0 }, ms(start, duration_ms / 2))
            .await,
    );
    effects.extend(
        session
            .dispatch_at(SessionEvent::PointerUp, ms(start, duration_ms))
            .await,
    );
    effects
}

fn completed(effects: &[SessionEffect]) -> Vec<&SessionEffect> {
    effects
        .iter()
        .filter(|e| matches!(e, SessionEffect::Completed(_)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_start_loads_batch() {
    let mut session = session(5, true);
    assert_eq!(session.state().phase(), Phase::Idle);

    let effects = session.start().await;
    assert_eq!(
        effects,
        vec![
            SessionEffect::PrefetchRequested { count: 5 },
            SessionEffect::Entered { item_id: 0 },
        ]
    );
    assert_eq!(session.state().phase(), Phase::Active);
    assert_eq!(session.state().items().len(), 5);
    assert_eq!(session.store().live_count(), 5);

    let first = &session.state().items()[0];
    assert_eq!(session.payload(first), Some(png_bytes()));
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_accept_even_items() {
    let mut session = session(5, true);
    session.start().await;

    let t0 = Instant::now();
    let mut effects = Vec::new();
    for (i, outcome) in [
        Outcome::Accept,
        Outcome::Reject,
        Outcome::Accept,
        Outcome::Reject,
        Outcome::Accept,
    ]
    .into_iter()
    .enumerate()
    {
        effects.extend(
            session
                .dispatch_at(SessionEvent::Decide(outcome), ms(t0, i as u64 * 500))
                .await,
        );
    }

    assert_eq!(session.state().phase(), Phase::Complete);
    assert_eq!(session.state().cursor(), 5);

    let done = completed(&effects);
    assert_eq!(done.len(), 1);
    let SessionEffect::Completed(summary) = done[0] else {
        unreachable!()
    };
    assert_eq!(summary.accepted_count, 3);
    assert_eq!(summary.total_count, 5);
    let ids: Vec<usize> = summary.accepted.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![0, 2, 4]);

    // Further decisions after completion change nothing and never re-emit the summary.
    let late = session
        .dispatch_at(SessionEvent::Decide(Outcome::Accept), ms(t0, 10_000))
        .await;
    assert!(late.is_empty());
    assert_eq!(session.state().accepted().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_decisions_inside_settle_window_are_dropped() {
    let mut session = session(4, true);
    session.start().await;
    let t0 = Instant::now();

    session
        .dispatch_at(SessionEvent::Decide(Outcome::Accept), t0)
        .await;
    assert_eq!(session.state().cursor(), 1);

    let dropped = session
        .dispatch_at(SessionEvent::Decide(Outcome::Accept), ms(t0, 499))
        .await;
    assert!(dropped.is_empty());
    assert_eq!(session.state().cursor(), 1);
    assert_eq!(session.state().accepted().len(), 1);

    session
        .dispatch_at(SessionEvent::Decide(Outcome::Reject), ms(t0, 500))
        .await;
    assert_eq!(session.state().cursor(), 2);
    assert_eq!(session.state().accepted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_gesture_thresholds() {
    let mut session = session(6, true);
    session.start().await;
    let t0 = Instant::now();

    // Distance trigger.
    let effects = swipe(&mut session, t0, 120.0, 1000).await;
    assert!(effects.contains(&SessionEffect::Exited {
        item_id: 0,
        outcome: Outcome::Accept
    }));

    let effects = swipe(&mut session, ms(t0, 2000), -120.0, 1000).await;
    assert!(effects.contains(&SessionEffect::Exited {
        item_id: 1,
        outcome: Outcome::Reject
    }));

    // Below both triggers: snap back, nothing else changes.
    let effects = swipe(&mut session, ms(t0, 4000), 30.0, 1000).await;
    assert!(effects.contains(&SessionEffect::SnapBack { item_id: 2 }));
    assert_eq!(session.state().cursor(), 2);
    assert!(session.state().drag().is_none());

    // Velocity trigger: 60px in 100ms.
    let effects = swipe(&mut session, ms(t0, 6000), 60.0, 100).await;
    assert!(effects.contains(&SessionEffect::Exited {
        item_id: 2,
        outcome: Outcome::Accept
    }));

    let ids: Vec<usize> = session.state().accepted().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![0, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_drag_reports_highlight_past_threshold() {
    let mut session = session(2, true);
    session.start().await;
    let t0 = Instant::now();

    session
        .dispatch_at(SessionEvent::PointerDown { x: 50.0, y: 50.0 }, t0)
        .await;
    let near = session
        .dispatch_at(SessionEvent::PointerMove { x: 90.0, y: 50.0 }, ms(t0, 50))
        .await;
    let far = session
        .dispatch_at(SessionEvent::PointerMove { x: -80.0, y: 60.0 }, ms(t0, 100))
        .await;

    let SessionEffect::Transform { transform, .. } = &near[0] else {
        panic!("expected transform, got {:?}", near);
    };
    assert_eq!(transform.highlight, None);

    let SessionEffect::Transform { transform, .. } = &far[0] else {
        panic!("expected transform, got {:?}", far);
    };
    assert_eq!(transform.translate_x, -130.0);
    assert_eq!(transform.translate_y, 10.0);
    assert!(transform.highlight.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_keyboard_and_gesture_converge() {
    let mut by_key = session(2, true);
    let mut by_drag = session(2, true);
    by_key.start().await;
    by_drag.start().await;
    let t0 = Instant::now();

    let key_effects = by_key.command(Command::Accept).await;
    let drag_effects = swipe(&mut by_drag, t0, 150.0, 400).await;

    let exit = SessionEffect::Exited {
        item_id: 0,
        outcome: Outcome::Accept,
    };
    assert!(key_effects.contains(&exit));
    assert!(drag_effects.contains(&exit));
    let key_ids: Vec<usize> = by_key.state().accepted().iter().map(|i| i.id).collect();
    let drag_ids: Vec<usize> = by_drag.state().accepted().iter().map(|i| i.id).collect();
    assert_eq!(key_ids, drag_ids);
    assert_eq!(by_key.state().cursor(), by_drag.state().cursor());
}

#[tokio::test(start_paused = true)]
async fn test_reset_releases_previous_batch() {
    let mut session = session(3, true);
    session.start().await;
    let old_items = session.state().items().to_vec();

    // Reset is ignored mid-session.
    assert!(session.reset().await.is_empty());

    for _ in 0..3 {
        session.command(Command::Accept).await;
        session.settle().await;
    }
    assert_eq!(session.state().phase(), Phase::Complete);

    let effects = session.reset().await;
    assert_eq!(effects[0], SessionEffect::Released { count: 3 });
    assert!(effects.contains(&SessionEffect::PrefetchRequested { count: 3 }));

    assert_eq!(session.state().phase(), Phase::Active);
    assert_eq!(session.state().cursor(), 0);
    assert!(session.state().accepted().is_empty());
    assert_eq!(session.state().items().len(), 3);
    for item in &old_items {
        assert!(session.payload(item).is_none());
        assert!(!session.store().is_live(item.blob_handle().unwrap()));
    }
    assert_eq!(session.store().live_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_settle_reports_next_card() {
    let mut session = session(2, true);
    session.start().await;

    session.command(Command::Reject).await;
    let t0 = Instant::now();
    let entered = session.settle().await;

    assert_eq!(entered, Some(SessionEffect::Entered { item_id: 1 }));
    assert!(t0.elapsed() >= Duration::from_millis(500));
    assert_eq!(session.settle().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_cursor_invariants_under_noisy_input() {
    let n = 8;
    let mut session = session(n, true);
    session.start().await;
    let t0 = Instant::now();

    // Deterministic pseudo-random event stream.
    let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
    let mut now = 0u64;
    let mut last_cursor = 0;
    for _ in 0..400 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        now += (seed >> 33) % 300;
        let x = ((seed >> 16) % 400) as f64 - 200.0;
        let event = match (seed >> 60) % 6 {
            0 => SessionEvent::PointerDown { x: 0.0, y: 0.0 },
            1 | 2 => SessionEvent::PointerMove { x, y: 0.0 },
            3 => SessionEvent::PointerUp,
            4 => SessionEvent::Decide(Outcome::Accept),
            _ => SessionEvent::Decide(Outcome::Reject),
        };
        session.dispatch_at(event, ms(t0, now)).await;

        let state = session.state();
        assert!(state.cursor() >= last_cursor);
        assert!(state.cursor() <= last_cursor + 1);
        assert!(state.cursor() <= n);
        last_cursor = state.cursor();

        // Accepted is an ordered subsequence of items[..cursor].
        let visited: Vec<usize> = state.items()[..state.cursor()].iter().map(|i| i.id).collect();
        let mut it = visited.iter();
        for accepted in state.accepted() {
            assert!(it.any(|id| *id == accepted.id));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_source_still_completes() {
    let mut session = session(3, false);
    session.start().await;

    assert!(session.state().items().iter().all(|item| item.is_fallback));
    assert_eq!(session.stats().fallbacks, 3);

    let t0 = Instant::now();
    for i in 0..3 {
        session
            .dispatch_at(SessionEvent::Decide(Outcome::Reject), ms(t0, i * 500))
            .await;
    }
    let summary = session.summary().unwrap();
    assert_eq!(summary.accepted_count, 0);
    assert_eq!(summary.total_count, 3);
}

struct NoShare;

impl ShareTarget for NoShare {
    fn share(&self, _title: &str, _text: &str) -> Result<ShareMethod, ShareError> {
        Err(ShareError::Unavailable)
    }
}

#[tokio::test(start_paused = true)]
async fn test_share_failure_does_not_touch_session() {
    let mut session = session(1, true);
    session.start().await;
    assert_eq!(session.share_results(&NoShare, 0), "No results to share yet");

    session.command(Command::Accept).await;
    assert_eq!(
        session.share_results(&NoShare, 0),
        "Share feature not available on this device"
    );
    assert_eq!(session.state().phase(), Phase::Complete);
    assert_eq!(session.state().accepted().len(), 1);
}
