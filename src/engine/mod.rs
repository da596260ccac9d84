// Engine orchestration: batch prefetch, blob ownership and the swipe session lifecycle.

pub mod gesture;
pub mod item;
pub mod prefetcher;
pub mod session;
pub mod state;
pub mod stats;
pub mod store;
