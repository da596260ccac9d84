use thiserror::Error;
use tracing::{info, warn};

use super::summary::SessionSummary;

/// How a share target delivered the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMethod {
    /// Platform share sheet.
    Native,
    /// Copied to the clipboard.
    Clipboard,
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share feature not available")]
    Unavailable,
    #[error("share failed: {0}")]
    Failed(String),
}

/// Platform share capability. Implementations must not touch session state.
pub trait ShareTarget {
    fn share(&self, title: &str, text: &str) -> Result<ShareMethod, ShareError>;
}

pub const SHARE_TITLE: &str = "My Swipe Results";

/// Share the summary and return user-facing feedback. Never fails.
pub fn share_summary(target: &dyn ShareTarget, summary: &SessionSummary, variant: usize) -> String {
    let text = summary.message(variant);
    match target.share(SHARE_TITLE, &text) {
        Ok(ShareMethod::Native) => {
            info!("results shared");
            "Shared successfully!".to_string()
        }
        Ok(ShareMethod::Clipboard) => {
            info!("results copied to clipboard");
            "Results copied to clipboard!".to_string()
        }
        Err(ShareError::Unavailable) => {
            warn!("share unavailable");
            "Share feature not available on this device".to_string()
        }
        Err(e) => {
            warn!("{}", e);
            "Unable to copy to clipboard".to_string()
        }
    }
}
