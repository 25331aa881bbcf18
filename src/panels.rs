use std::sync::Arc;
use tracing::info;

use crate::document::Document;
use crate::render::apply_snapshot;
use crate::screenshot::ScreenshotRefresher;
use crate::state::SharedState;
use crate::types::OperatorState;

/// Where snapshots land, whether they came from polling or from the push
/// channel. Both paths write the same regions; the last write wins.
#[derive(Clone)]
pub struct Panels {
    document: Arc<Document>,
    state: SharedState,
    screenshots: Arc<ScreenshotRefresher>,
}

impl Panels {
    pub fn new(
        document: Arc<Document>,
        state: SharedState,
        screenshots: Arc<ScreenshotRefresher>,
    ) -> Self {
        Self {
            document,
            state,
            screenshots,
        }
    }

    /// Returns the number of regions that changed.
    pub fn apply(&self, snapshot: &OperatorState) -> usize {
        let paused = self.state.read().is_paused;
        let changed = apply_snapshot(&self.document, snapshot, paused);

        if snapshot.processed_screenshot_available && self.screenshots.request_processed() {
            info!("processed screenshot available, switching display");
        }
        changed
    }
}
