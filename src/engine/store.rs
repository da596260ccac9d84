// Per-batch blob arena: owns fetched image payloads and hands out revocable handles.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use bitvec::prelude::*;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

/// Revocable reference to a payload held by a [`BlobStore`].
///
/// A handle is only valid for the batch generation that issued it; releasing
/// the batch invalidates every handle at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    generation: u64,
    slot: usize,
}

impl BlobHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct BlobStore {
    blobs: RwLock<Vec<Option<Bytes>>>,
    bitmap: RwLock<BitVec>,
    generation: AtomicU64,
    cached_bytes: AtomicU64,
}

impl BlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(Vec::new()),
            bitmap: RwLock::new(BitVec::new()),
            generation: AtomicU64::new(0),
            cached_bytes: AtomicU64::new(0),
        }
    }

    /// Start a new batch of `slot_count` slots, releasing whatever the previous batch held.
    /// Returns the new generation.
    pub fn begin_batch(&self, slot_count: usize) -> u64 {
        self.release_batch();

        let mut blobs = self.blobs.write();
        let mut bitmap = self.bitmap.write();
        *blobs = vec![None; slot_count];
        *bitmap = bitvec![0; slot_count];

        self.generation.load(Ordering::Acquire)
    }

    /// Store a validated payload for `slot` in the current batch.
    pub fn put(&self, slot: usize, data: Bytes) -> Result<BlobHandle> {
        let mut blobs = self.blobs.write();
        let mut bitmap = self.bitmap.write();
        if slot >= blobs.len() {
            return Err(anyhow!(
                "slot {} out of range (batch has {})",
                slot,
                blobs.len()
            ));
        }

        let len = data.len() as u64;
        if let Some(previous) = blobs[slot].replace(data) {
            self.cached_bytes
                .fetch_sub(previous.len() as u64, Ordering::Relaxed);
        }
        bitmap.set(slot, true);
        self.cached_bytes.fetch_add(len, Ordering::Relaxed);

        Ok(BlobHandle {
            generation: self.generation.load(Ordering::Acquire),
            slot,
        })
    }

    /// Resolve a handle. Returns `None` once the handle was revoked or its batch released.
    pub fn get(&self, handle: &BlobHandle) -> Option<Bytes> {
        if !self.is_live(handle) {
            return None;
        }
        let blobs = self.blobs.read();
        blobs.get(handle.slot).and_then(|b| b.clone())
    }

    pub fn is_live(&self, handle: &BlobHandle) -> bool {
        if handle.generation != self.generation.load(Ordering::Acquire) {
            return false;
        }
        let bitmap = self.bitmap.read();
        bitmap.get(handle.slot).map(|b| *b).unwrap_or(false)
    }

    /// Revoke a single handle. Returns `true` if it was live.
    pub fn revoke(&self, handle: &BlobHandle) -> bool {
        if handle.generation != self.generation.load(Ordering::Acquire) {
            return false;
        }
        let mut blobs = self.blobs.write();
        let mut bitmap = self.bitmap.write();
        if handle.slot >= blobs.len() || !bitmap[handle.slot] {
            return false;
        }
        if let Some(data) = blobs[handle.slot].take() {
            self.cached_bytes
                .fetch_sub(data.len() as u64, Ordering::Relaxed);
        }
        bitmap.set(handle.slot, false);
        true
    }

    /// Free every payload of the current batch and invalidate all its handles.
    /// Returns the number of payloads released.
    pub fn release_batch(&self) -> usize {
        let mut blobs = self.blobs.write();
        let mut bitmap = self.bitmap.write();
        let released = bitmap.count_ones();

        blobs.clear();
        bitmap.clear();
        self.cached_bytes.store(0, Ordering::Relaxed);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        if released > 0 {
            debug!(
                "released {} blobs, store now at generation {}",
                released, generation
            );
        }
        released
    }

    pub fn live_count(&self) -> usize {
        self.bitmap.read().count_ones()
    }

    pub fn slot_count(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn cached_bytes(&self) -> u64 {
        self.cached_bytes.load(Ordering::Relaxed)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new()
    }
}
