//! The display surface: a fixed set of named regions, each holding either
//! plain text or a list of items.
//!
//! Writers go through [`Document::set_text`] / [`Document::set_list`], which
//! skip writes that would not change anything. Every real change is broadcast
//! so the headless runner (and anything else) can follow along.

use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::warn;

use crate::render::{WAITING_FOR_OPERATIONS, content_markup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    UserGoal,
    FormulatedObjective,
    CurrentOperation,
    PastOperation,
    VisualAnalysis,
    ThinkingProcess,
    StepsList,
    Operations,
    LlmStream,
    CompanionStatus,
}

impl Region {
    pub const ALL: [Region; 10] = [
        Region::UserGoal,
        Region::FormulatedObjective,
        Region::CurrentOperation,
        Region::PastOperation,
        Region::VisualAnalysis,
        Region::ThinkingProcess,
        Region::StepsList,
        Region::Operations,
        Region::LlmStream,
        Region::CompanionStatus,
    ];

    /// Stable identifier used in logs and in the HTML snapshot.
    pub fn element_id(self) -> &'static str {
        match self {
            Region::UserGoal => "userGoalDisplay",
            Region::FormulatedObjective => "formulatedObjectiveDisplay",
            Region::CurrentOperation => "currentOperationDisplay",
            Region::PastOperation => "pastOperationDisplay",
            Region::VisualAnalysis => "visualAnalysisDisplay",
            Region::ThinkingProcess => "thinkingProcessDisplay",
            Region::StepsList => "stepsGeneratedList",
            Region::Operations => "operationsGeneratedText",
            Region::LlmStream => "llmStreamContent",
            Region::CompanionStatus => "omniparserStatusText",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Region::UserGoal => "Your Goal",
            Region::FormulatedObjective => "AI Formulated Objective",
            Region::CurrentOperation => "Current Operation",
            Region::PastOperation => "Past Operation",
            Region::VisualAnalysis => "Visual Analysis",
            Region::ThinkingProcess => "Thinking Process",
            Region::StepsList => "Steps Generated",
            Region::Operations => "Operations Generated",
            Region::LlmStream => "LLM Stream",
            Region::CompanionStatus => "OmniParser",
        }
    }

    fn initial_content(self) -> Content {
        let text = match self {
            Region::UserGoal => "Enter your goal below and press Send.",
            Region::FormulatedObjective => "Waiting for AI...",
            Region::CurrentOperation => "Idle",
            Region::PastOperation => "None",
            Region::VisualAnalysis => "Waiting for visual analysis...",
            Region::ThinkingProcess => "Waiting for thinking process...",
            Region::StepsList => return Content::List(vec![ListItem::new("Waiting for steps...")]),
            Region::Operations => WAITING_FOR_OPERATIONS,
            Region::LlmStream => "No stream content.",
            Region::CompanionStatus => "Checking OmniParser...",
        };
        Content::Text(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub text: String,
    /// Preformatted block shown under the item.
    pub detail: Option<String>,
}

impl ListItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            detail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    List(Vec<ListItem>),
}

impl Content {
    /// Plain-text rendering; list items one per line.
    pub fn plain_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::List(items) => items
                .iter()
                .map(|item| match &item.detail {
                    Some(detail) => format!("{}\n{}", item.text, detail),
                    None => item.text.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentEvent {
    pub region: Region,
    pub content: Content,
}

pub struct Document {
    nodes: RwLock<HashMap<Region, Content>>,
    events: broadcast::Sender<DocumentEvent>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Document with every region mounted.
    pub fn new() -> Self {
        Self::with_regions(&Region::ALL)
    }

    /// Document with only `regions` mounted. Writes to the others are
    /// reported and dropped.
    pub fn with_regions(regions: &[Region]) -> Self {
        let nodes = regions
            .iter()
            .map(|region| (*region, region.initial_content()))
            .collect();
        let (events, _) = broadcast::channel(256);
        Self {
            nodes: RwLock::new(nodes),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    pub fn set_text(&self, region: Region, text: impl Into<String>) -> bool {
        self.replace(region, Content::Text(text.into()))
    }

    pub fn set_list(&self, region: Region, items: Vec<ListItem>) -> bool {
        self.replace(region, Content::List(items))
    }

    /// Returns `true` if the region existed and its content changed.
    pub fn replace(&self, region: Region, content: Content) -> bool {
        {
            let mut nodes = self.nodes.write();
            let Some(node) = nodes.get_mut(&region) else {
                warn!(
                    region = region.element_id(),
                    "region not mounted, skipping update"
                );
                return false;
            };
            if *node == content {
                return false;
            }
            *node = content.clone();
        }
        // nobody listening is fine
        let _ = self.events.send(DocumentEvent { region, content });
        true
    }

    pub fn content(&self, region: Region) -> Option<Content> {
        self.nodes.read().get(&region).cloned()
    }

    pub fn text(&self, region: Region) -> Option<String> {
        self.nodes.read().get(&region).map(Content::plain_text)
    }

    pub fn inner_html(&self, region: Region) -> Option<String> {
        self.nodes.read().get(&region).map(content_markup)
    }

    /// HTML fragment of every mounted region, in display order.
    pub fn to_html(&self) -> String {
        let nodes = self.nodes.read();
        let mut html = String::new();
        for region in Region::ALL {
            let Some(content) = nodes.get(&region) else {
                continue;
            };
            let body = match content {
                Content::Text(_) => format!("<p>{}</p>", content_markup(content)),
                Content::List(_) => format!("<ul>{}</ul>", content_markup(content)),
            };
            html.push_str(&format!(
                "<section id=\"{}\"><h2>{}</h2>{}</section>\n",
                region.element_id(),
                region.title(),
                body
            ));
        }
        html
    }
}
