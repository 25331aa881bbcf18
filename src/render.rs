//! Mapping from an [`OperatorState`] snapshot to document regions.

use serde_json::Value;
use tracing::debug;

use crate::document::{Content, Document, ListItem, Region};
use crate::types::{Operation, OperatorState, StepsField};

pub const NO_STEPS: &str = "No steps generated yet.";
pub const WAITING_FOR_OPERATIONS: &str = "Waiting for operations...";
pub const PAUSED_BY_USER: &str = "Paused by user";
pub const RUNNING: &str = "Running...";

/// Escapes `& < > " '` so model text can never inject markup.
pub fn escape_html(unsafe_text: &str) -> String {
    html_escape::encode_safe(unsafe_text).into_owned()
}

/// Escaped markup for one region's content.
pub fn content_markup(content: &Content) -> String {
    match content {
        Content::Text(text) => escape_html(text),
        Content::List(items) => items
            .iter()
            .map(|item| match &item.detail {
                Some(detail) => format!(
                    "<li>{}<pre>{}</pre></li>",
                    escape_html(&item.text),
                    escape_html(detail)
                ),
                None => format!("<li>{}</li>", escape_html(&item.text)),
            })
            .collect(),
    }
}

/// `None` for a steps payload of unknown shape.
pub fn step_items(steps: &StepsField) -> Option<Vec<ListItem>> {
    match steps {
        StepsField::List(entries) if entries.is_empty() => Some(vec![ListItem::new(NO_STEPS)]),
        StepsField::List(entries) => Some(
            entries
                .iter()
                .map(|entry| ListItem::new(entry.label()))
                .collect(),
        ),
        StepsField::Single(text) => Some(vec![ListItem::new(text.clone())]),
        StepsField::Other(_) => None,
    }
}

pub fn operations_content(value: &Value) -> Content {
    if let Some(operations) = parse_operations(value) {
        return Content::List(
            operations
                .into_iter()
                .map(|op| {
                    let text = if op.summary.is_empty() {
                        op.kind
                    } else {
                        format!("{}: {}", op.kind, op.summary)
                    };
                    let detail = op.details.as_ref().map(pretty_json);
                    ListItem { text, detail }
                })
                .collect(),
        );
    }

    match value {
        Value::Null => Content::Text(WAITING_FOR_OPERATIONS.to_string()),
        Value::Object(map) if map.is_empty() => Content::Text(WAITING_FOR_OPERATIONS.to_string()),
        Value::String(text) => Content::Text(text.clone()),
        other => Content::Text(pretty_json(other)),
    }
}

/// `Some` only when `operations` is a non-empty array of well-formed entries.
fn parse_operations(value: &Value) -> Option<Vec<Operation>> {
    let entries = value.get("operations")?.as_array()?;
    if entries.is_empty() {
        return None;
    }
    entries
        .iter()
        .map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect()
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn indicates_paused(status: &str) -> bool {
    status.to_lowercase().contains("paused")
}

/// Writes every present field of `state` into `doc`. Returns how many
/// regions actually changed.
///
/// While `paused`, a backend current-operation string only replaces the
/// local "Paused by user" text if it itself reports a paused state.
pub fn apply_snapshot(doc: &Document, state: &OperatorState, paused: bool) -> usize {
    let mut changed = 0;
    let mut text = |region: Region, value: Option<&str>| {
        if let Some(value) = value
            && doc.set_text(region, value)
        {
            changed += 1;
        }
    };

    text(Region::UserGoal, state.user_goal.as_deref());
    text(
        Region::FormulatedObjective,
        state.formulated_objective.as_deref(),
    );

    match state.current_operation() {
        Some(op) if paused && !indicates_paused(op) => {
            debug!(backend = op, "keeping local pause message");
        }
        op => text(Region::CurrentOperation, op),
    }

    text(Region::PastOperation, state.past_operation_display.as_deref());
    text(
        Region::VisualAnalysis,
        state.current_visual_analysis.as_deref(),
    );
    text(
        Region::ThinkingProcess,
        state.current_thinking_process.as_deref(),
    );
    text(Region::LlmStream, state.llm_stream_content.as_deref());

    if let Some(steps) = &state.current_steps_generated {
        match step_items(steps) {
            Some(items) => {
                if doc.set_list(Region::StepsList, items) {
                    changed += 1;
                }
            }
            None => debug!(?steps, "ignoring steps of unknown shape"),
        }
    }
    if let Some(operations) = &state.current_operations_generated
        && doc.replace(Region::Operations, operations_content(operations))
    {
        changed += 1;
    }

    changed
}
