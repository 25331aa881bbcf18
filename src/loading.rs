//! Loading-screen controller.
//!
//! The overlay goes away on the first of: the companion readiness signal,
//! the safety timeout, or a manual Escape. Whatever comes later is a no-op.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::{OverlayPhase, SharedState};

/// Time between marking the overlay hidden and dropping it entirely.
pub const REMOVE_DELAY: Duration = Duration::from_millis(500);

pub struct LoadingScreen {
    state: SharedState,
    runtime: Handle,
}

impl LoadingScreen {
    /// Must be called from inside a tokio runtime; later calls to [`hide`]
    /// may come from any thread.
    ///
    /// [`hide`]: LoadingScreen::hide
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            runtime: Handle::current(),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.state.read().loading_screen_hidden
    }

    pub fn phase(&self) -> OverlayPhase {
        self.state.read().overlay
    }

    /// Hides the overlay. Returns `true` only for the call that did it.
    pub fn hide(&self, reason: &str) -> bool {
        {
            let mut state = self.state.write();
            if state.loading_screen_hidden {
                debug!(reason, "loading screen already hidden, ignoring");
                return false;
            }
            state.loading_screen_hidden = true;
            state.overlay = OverlayPhase::Hiding;
        }
        info!(reason, "hiding loading screen");

        let state = self.state.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(REMOVE_DELAY).await;
            state.write().overlay = OverlayPhase::Removed;
            debug!("loading overlay removed");
        });
        true
    }

    /// Hides the overlay after `timeout` unless something else did first.
    pub fn arm_safety_timeout(
        self: &std::sync::Arc<Self>,
        timeout: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let this = self.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if !this.is_hidden() {
                        warn!(?timeout, "no readiness signal before safety timeout");
                        this.hide("safety timeout");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UiState;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn hide_transitions_exactly_once() {
        let loading = LoadingScreen::new(UiState::shared());
        assert_eq!(loading.phase(), OverlayPhase::Visible);

        let results: Vec<bool> = ["OmniParser is ready", "Escape key pressed", "safety timeout"]
            .iter()
            .map(|reason| loading.hide(reason))
            .collect();

        assert_eq!(results, vec![true, false, false]);
        assert!(loading.is_hidden());
        assert_eq!(loading.phase(), OverlayPhase::Hiding);
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_is_removed_after_transition_delay() {
        let loading = LoadingScreen::new(UiState::shared());
        loading.hide("test");

        tokio::time::sleep(REMOVE_DELAY - Duration::from_millis(1)).await;
        assert_eq!(loading.phase(), OverlayPhase::Hiding);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(loading.phase(), OverlayPhase::Removed);
    }

    #[tokio::test(start_paused = true)]
    async fn safety_timeout_hides_when_nothing_else_does() {
        let loading = Arc::new(LoadingScreen::new(UiState::shared()));
        let task = loading.arm_safety_timeout(Duration::from_secs(20), CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(19)).await;
        assert!(!loading.is_hidden());

        task.await.unwrap();
        assert!(loading.is_hidden());
    }

    #[tokio::test(start_paused = true)]
    async fn safety_timeout_is_noop_after_readiness() {
        let loading = Arc::new(LoadingScreen::new(UiState::shared()));
        let task = loading.arm_safety_timeout(Duration::from_secs(20), CancellationToken::new());
        assert!(loading.hide("OmniParser is ready"));

        task.await.unwrap();
        tokio::time::sleep(REMOVE_DELAY).await;
        assert_eq!(loading.phase(), OverlayPhase::Removed);
    }
}
