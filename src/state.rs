//! Client-side UI state shared by every component.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::config::DEFAULT_OMNIPARSER_PORT;

pub type SharedState = Arc<RwLock<UiState>>;

pub const WAITING_FOR_FRAME: &str = "Waiting for frame";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenshotKind {
    Raw,
    Processed,
}

impl ScreenshotKind {
    pub fn path(self) -> &'static str {
        match self {
            ScreenshotKind::Raw => "/automoy_current.png",
            ScreenshotKind::Processed => "/processed_screenshot.png",
        }
    }
}

impl fmt::Display for ScreenshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenshotKind::Raw => f.write_str("raw"),
            ScreenshotKind::Processed => f.write_str("processed"),
        }
    }
}

/// Decoded RGBA8 pixels of one screenshot.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// What the screenshot panel shows: one of placeholder, raw image or
/// processed image, never two at once.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenshotView {
    Placeholder { message: String },
    Image { kind: ScreenshotKind, frame: Arc<Frame> },
}

impl ScreenshotView {
    pub fn placeholder() -> Self {
        ScreenshotView::Placeholder {
            message: WAITING_FOR_FRAME.to_string(),
        }
    }

    pub fn kind(&self) -> Option<ScreenshotKind> {
        match self {
            ScreenshotView::Image { kind, .. } => Some(*kind),
            ScreenshotView::Placeholder { .. } => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ScreenshotView::Placeholder { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionStatus {
    Unknown,
    Ready,
    Error,
    Offline,
}

impl CompanionStatus {
    pub fn label(self) -> &'static str {
        match self {
            CompanionStatus::Unknown => "Checking OmniParser...",
            CompanionStatus::Ready => "OmniParser Ready",
            CompanionStatus::Error => "OmniParser Error",
            CompanionStatus::Offline => "OmniParser Offline",
        }
    }
}

/// Lifecycle of the loading overlay. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OverlayPhase {
    Visible,
    /// Marked hidden, waiting for the transition delay before removal.
    Hiding,
    Removed,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub is_paused: bool,
    pub loading_screen_hidden: bool,
    pub overlay: OverlayPhase,
    pub omniparser_ready: bool,
    pub omniparser_port: u16,
    pub companion_status: CompanionStatus,
    pub screenshot: ScreenshotView,
    pub goal_input: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            is_paused: false,
            loading_screen_hidden: false,
            overlay: OverlayPhase::Visible,
            omniparser_ready: false,
            omniparser_port: DEFAULT_OMNIPARSER_PORT,
            companion_status: CompanionStatus::Unknown,
            screenshot: ScreenshotView::placeholder(),
            goal_input: String::new(),
        }
    }
}

impl UiState {
    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::default()))
    }
}
