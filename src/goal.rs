use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::BackendClient;
use crate::document::{Document, Region};
use crate::state::SharedState;
use crate::types::GoalResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing to send; no request was made.
    Empty,
    Accepted(GoalResponse),
    Failed(String),
}

/// The goal input form. The input text lives in [`crate::state::UiState`]
/// so the window can edit it and a successful submit can clear it.
pub struct GoalForm {
    client: Arc<BackendClient>,
    document: Arc<Document>,
    state: SharedState,
}

impl GoalForm {
    pub fn new(client: Arc<BackendClient>, document: Arc<Document>, state: SharedState) -> Self {
        Self {
            client,
            document,
            state,
        }
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.state.write().goal_input = text.into();
    }

    pub fn input(&self) -> String {
        self.state.read().goal_input.clone()
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let goal = self.input().trim().to_string();
        if goal.is_empty() {
            debug!("empty goal, not submitting");
            return SubmitOutcome::Empty;
        }

        match self.client.set_goal(&goal).await {
            Ok(response) => {
                if let Some(echo) = &response.goal {
                    self.document.set_text(Region::UserGoal, echo.as_str());
                    info!(goal = %echo, "goal set");
                }
                if let Some(objective) = &response.formulated_objective {
                    self.document
                        .set_text(Region::FormulatedObjective, objective.as_str());
                }
                self.state.write().goal_input.clear();
                SubmitOutcome::Accepted(response)
            }
            Err(e) => {
                error!(error = %e, "error setting goal");
                let message = format!("Error setting goal: {e}");
                self.document.set_text(Region::UserGoal, message.as_str());
                SubmitOutcome::Failed(message)
            }
        }
    }
}
