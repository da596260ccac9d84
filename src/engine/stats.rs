// Prefetch statistics: attempt outcomes, fallbacks, bytes downloaded, active slot workers.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

struct StatsSample {
    at: Instant,
    download_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub fallbacks: u64,
    pub fetch_failures: u64,
    pub validation_failures: u64,
    pub timeouts: u64,
    pub download_bytes_total: u64,
    pub download_bps: u64,
    pub active_workers: u32,
}

impl StatsSnapshot {
    /// Fraction of resolved slots that got a real image.
    pub fn success_rate(&self) -> f64 {
        let resolved = self.successes + self.fallbacks;
        if resolved > 0 {
            self.successes as f64 / resolved as f64
        } else {
            0.0
        }
    }
}

pub struct PrefetchStats {
    attempts: AtomicU64,
    successes: AtomicU64,
    fallbacks: AtomicU64,
    fetch_failures: AtomicU64,
    validation_failures: AtomicU64,
    timeouts: AtomicU64,
    download_bytes_total: AtomicU64,
    active_workers: AtomicU32,
    last_sample: Mutex<StatsSample>,
}

impl PrefetchStats {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            download_bytes_total: AtomicU64::new(0),
            active_workers: AtomicU32::new(0),
            last_sample: Mutex::new(StatsSample {
                at: Instant::now(),
                download_bytes: 0,
            }),
        }
    }

    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, bytes: u64) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.download_bytes_total.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_workers(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_workers(&self) {
        self.active_workers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let now = Instant::now();
        let current_download = self.download_bytes_total.load(Ordering::Relaxed);

        let download_bps = {
            let mut sample = self.last_sample.lock();
            let elapsed = now.duration_since(sample.at).as_secs_f64();

            let bps = if elapsed > 0.1 {
                ((current_download - sample.download_bytes) as f64 / elapsed) as u64
            } else {
                0
            };

            // Update sample for next call
            sample.at = now;
            sample.download_bytes = current_download;

            bps
        };

        StatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            download_bytes_total: current_download,
            download_bps,
            active_workers: self.active_workers.load(Ordering::Relaxed),
        }
    }
}

impl Default for PrefetchStats {
    fn default() -> Self {
        Self::new()
    }
}
