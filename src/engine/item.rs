use chrono::{DateTime, Utc};

use super::store::BlobHandle;

/// What the presentation layer renders for a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageHandle {
    /// Fetched payload held by the session's blob store.
    Blob(BlobHandle),
    /// Static placeholder reference used after a slot exhausted its attempts.
    Fallback(String),
}

/// One resolved slot of a prefetched batch. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    /// Stable slot index in `0..N`.
    pub id: usize,
    pub handle: ImageHandle,
    pub acquired_at: DateTime<Utc>,
    pub is_fallback: bool,
}

impl ImageItem {
    pub fn fetched(id: usize, handle: BlobHandle) -> Self {
        Self {
            id,
            handle: ImageHandle::Blob(handle),
            acquired_at: Utc::now(),
            is_fallback: false,
        }
    }

    pub fn fallback(id: usize, reference: String) -> Self {
        Self {
            id,
            handle: ImageHandle::Fallback(reference),
            acquired_at: Utc::now(),
            is_fallback: true,
        }
    }

    pub fn blob_handle(&self) -> Option<&BlobHandle> {
        match &self.handle {
            ImageHandle::Blob(handle) => Some(handle),
            ImageHandle::Fallback(_) => None,
        }
    }
}
