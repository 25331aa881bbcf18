use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::api::BackendClient;
use crate::document::{Document, Region};
use crate::error::{DashboardError, Result};
use crate::render::{PAUSED_BY_USER, RUNNING};
use crate::state::SharedState;

/// Icon, label and tooltip of the pause button for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonFace {
    pub icon: &'static str,
    pub label: &'static str,
    pub title: &'static str,
}

impl ButtonFace {
    pub fn for_state(is_paused: bool) -> Self {
        if is_paused {
            ButtonFace {
                icon: "▶",
                label: "Resume",
                title: "Resume Automoy",
            }
        } else {
            ButtonFace {
                icon: "⏸",
                label: "Pause",
                title: "Pause Automoy",
            }
        }
    }
}

pub struct PauseControl {
    client: Arc<BackendClient>,
    document: Arc<Document>,
    state: SharedState,
    /// Held for the whole round-trip so toggles reach the server one at a time.
    exclusive: Mutex<()>,
}

impl PauseControl {
    pub fn new(client: Arc<BackendClient>, document: Arc<Document>, state: SharedState) -> Self {
        Self {
            client,
            document,
            state,
            exclusive: Mutex::new(()),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().is_paused
    }

    pub fn face(&self) -> ButtonFace {
        ButtonFace::for_state(self.is_paused())
    }

    /// Asks the backend to flip the pause state and shows the result
    /// without waiting for the next poll.
    ///
    /// Overlapping calls queue behind each other, so the local flag always
    /// ends on the answer to the last request the server handled.
    pub async fn toggle(&self) -> Result<bool> {
        let _exclusive = self.exclusive.lock().await;
        debug!("toggling pause state");

        let response = self.client.toggle_pause().await.inspect_err(|e| {
            error!(error = %e, "error toggling pause state");
        })?;
        if !response.is_success() {
            let message = response
                .message
                .unwrap_or_else(|| format!("status {}", response.status));
            error!(%message, "failed to toggle pause state");
            return Err(DashboardError::Rejected(message));
        }

        self.state.write().is_paused = response.is_paused;
        self.document.set_text(
            Region::CurrentOperation,
            if response.is_paused { PAUSED_BY_USER } else { RUNNING },
        );
        info!(
            paused = response.is_paused,
            "pause state toggled to {}",
            if response.is_paused { "Paused" } else { "Running" }
        );
        Ok(response.is_paused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_face_swaps_between_pause_and_resume() {
        assert_eq!(ButtonFace::for_state(false).label, "Pause");
        assert_eq!(ButtonFace::for_state(false).title, "Pause Automoy");
        assert_eq!(ButtonFace::for_state(true).label, "Resume");
        assert_eq!(ButtonFace::for_state(true).title, "Resume Automoy");
    }
}
