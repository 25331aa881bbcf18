use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Full snapshot of the backend operator, as served by `/operator_state`
/// and pushed over `/stream_operator_updates`.
///
/// Every field is optional. An absent field means "nothing to update".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulated_objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_operation_display: Option<String>,
    /// Coarse status line, used when no operation display is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_operation_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_visual_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_thinking_process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_steps_generated: Option<StepsField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_operations_generated: Option<Value>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub processed_screenshot_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_stream_content: Option<String>,
}

impl OperatorState {
    /// Text for the current-operation panel.
    pub fn current_operation(&self) -> Option<&str> {
        self.current_operation_display
            .as_deref()
            .or(self.operator_status.as_deref())
    }
}

/// Python backends send `None` as an explicit `null`.
fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Steps arrive as a list, but older backends sometimes send a bare string.
/// Anything else is kept as `Other` and left off the display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepsField {
    List(Vec<StepEntry>),
    Single(String),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepEntry {
    Text(String),
    Described { description: String },
    Other(Value),
}

impl StepEntry {
    pub fn label(&self) -> String {
        match self {
            StepEntry::Text(text) => text.clone(),
            StepEntry::Described { description } => description.clone(),
            StepEntry::Other(value) => value.to_string(),
        }
    }
}

/// One planned operation inside `current_operations_generated.operations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRequest {
    pub goal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalResponse {
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub formulated_objective: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TogglePauseResponse {
    pub status: String,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TogglePauseResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Body of `GET /config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(rename = "OMNIPARSER_PORT", default)]
    pub omniparser_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_tolerates_missing_and_null_fields() {
        let state: OperatorState = serde_json::from_value(json!({
            "user_goal": "open calculator",
            "formulated_objective": null,
            "unknown_field": 42
        }))
        .unwrap();

        assert_eq!(state.user_goal.as_deref(), Some("open calculator"));
        assert_eq!(state.formulated_objective, None);
        assert!(!state.processed_screenshot_available);
    }

    #[test]
    fn steps_accept_strings_objects_and_bare_string() {
        let state: OperatorState = serde_json::from_value(json!({
            "current_steps_generated": ["Click button", {"description": "Type text"}, {"action": "wait"}]
        }))
        .unwrap();
        let Some(StepsField::List(steps)) = state.current_steps_generated else {
            panic!("expected a list");
        };
        let labels: Vec<String> = steps.iter().map(StepEntry::label).collect();
        assert_eq!(labels, vec!["Click button", "Type text", r#"{"action":"wait"}"#]);

        let single: OperatorState =
            serde_json::from_value(json!({"current_steps_generated": "only step"})).unwrap();
        assert_eq!(
            single.current_steps_generated,
            Some(StepsField::Single("only step".into()))
        );
    }

    #[test]
    fn null_processed_flag_reads_as_false() {
        let state: OperatorState = serde_json::from_str(
            r#"{"user_goal":"open calc","processed_screenshot_available":null}"#,
        )
        .unwrap();
        assert_eq!(state.user_goal.as_deref(), Some("open calc"));
        assert!(!state.processed_screenshot_available);

        let state: OperatorState =
            serde_json::from_str(r#"{"processed_screenshot_available":true}"#).unwrap();
        assert!(state.processed_screenshot_available);
    }

    #[test]
    fn unexpected_steps_shape_keeps_rest_of_snapshot() {
        let state: OperatorState = serde_json::from_str(
            r#"{"user_goal":"open calc","current_steps_generated":{"step":1}}"#,
        )
        .unwrap();
        assert_eq!(state.user_goal.as_deref(), Some("open calc"));
        assert_eq!(
            state.current_steps_generated,
            Some(StepsField::Other(json!({"step": 1})))
        );
    }

    #[test]
    fn current_operation_falls_back_to_status() {
        let state = OperatorState {
            operator_status: Some("Idle".into()),
            ..Default::default()
        };
        assert_eq!(state.current_operation(), Some("Idle"));
    }

    #[test]
    fn backend_config_reads_upper_case_port() {
        let config: BackendConfig = serde_json::from_str(r#"{"OMNIPARSER_PORT": 5100}"#).unwrap();
        assert_eq!(config.omniparser_port, Some(5100));
    }
}
