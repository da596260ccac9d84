use crate::engine::item::{ImageHandle, ImageItem};

/// Emitted once when the cursor reaches the end of the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub accepted_count: usize,
    pub total_count: usize,
    /// Accepted items in decision order.
    pub accepted: Vec<ImageItem>,
}

/// Number of distinct summary message templates.
pub const MESSAGE_VARIANTS: usize = 3;

impl SessionSummary {
    pub fn new(accepted: Vec<ImageItem>, total_count: usize) -> Self {
        Self {
            accepted_count: accepted.len(),
            total_count,
            accepted,
        }
    }

    /// Rounded share of accepted items; 0 for an empty batch.
    pub fn percentage(&self) -> u32 {
        if self.total_count == 0 {
            return 0;
        }
        (self.accepted_count as f64 * 100.0 / self.total_count as f64).round() as u32
    }

    pub fn accepted_handles(&self) -> impl Iterator<Item = &ImageHandle> {
        self.accepted.iter().map(|item| &item.handle)
    }

    /// Human-readable summary. `variant` picks one of [`MESSAGE_VARIANTS`] templates (wrapping).
    pub fn message(&self, variant: usize) -> String {
        let liked = self.accepted_count;
        let total = self.total_count;
        match variant % MESSAGE_VARIANTS {
            0 => format!(
                "I just discovered my preferences! I liked {} out of {} pictures ({}%).",
                liked,
                total,
                self.percentage()
            ),
            1 => format!("My verdict is in: {}/{} pictures won me over!", liked, total),
            _ => format!(
                "Just swiped through {} pictures and fell for {} of them!",
                total, liked
            ),
        }
    }
}
