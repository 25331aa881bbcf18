//! Screenshot refresher: fetches the raw or processed frame, decodes it and
//! swaps it into the screenshot panel.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::api::BackendClient;
use crate::error::{DashboardError, Result};
use crate::state::{Frame, ScreenshotKind, ScreenshotView, SharedState, WAITING_FOR_FRAME};

pub const ELLIPSIS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Shown(ScreenshotKind),
    Placeholder,
    /// A newer refresh took over before this one finished.
    Superseded,
}

pub struct ScreenshotRefresher {
    client: Arc<BackendClient>,
    state: SharedState,
    current: Mutex<Option<Pending>>,
    next_id: AtomicU64,
}

/// The refresh currently allowed to write the panel.
struct Pending {
    id: u64,
    kind: ScreenshotKind,
    token: CancellationToken,
}

/// Handed to the load that owns the panel until it finishes or is superseded.
struct Ticket {
    id: u64,
    kind: ScreenshotKind,
    token: CancellationToken,
}

/// Clears the pending slot when its load ends, however it ends.
struct Finish<'a> {
    refresher: &'a ScreenshotRefresher,
    id: u64,
}

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        let mut current = self.refresher.current.lock();
        if current.as_ref().is_some_and(|pending| pending.id == self.id) {
            *current = None;
        }
    }
}

impl ScreenshotRefresher {
    pub fn new(client: Arc<BackendClient>, state: SharedState) -> Self {
        Self {
            client,
            state,
            current: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn displayed_kind(&self) -> Option<ScreenshotKind> {
        self.state.read().screenshot.kind()
    }

    /// Kind requested by the load still in flight, if any.
    pub fn pending_kind(&self) -> Option<ScreenshotKind> {
        self.current.lock().as_ref().map(|pending| pending.kind)
    }

    /// Loads `kind` and shows it. A failed processed frame falls back to the
    /// raw one exactly once; a failed raw frame shows the placeholder.
    pub async fn refresh(&self, kind: ScreenshotKind) -> RefreshOutcome {
        let ticket = {
            let mut current = self.current.lock();
            self.supersede(&mut current, kind)
        };
        self.run(ticket).await
    }

    /// Starts a processed load in the background unless a processed frame is
    /// already on screen or on its way. Returns whether a load was started.
    pub fn request_processed(self: &Arc<Self>) -> bool {
        if self.displayed_kind() == Some(ScreenshotKind::Processed) {
            return false;
        }
        let ticket = {
            let mut current = self.current.lock();
            if current
                .as_ref()
                .is_some_and(|pending| pending.kind == ScreenshotKind::Processed)
            {
                debug!("processed screenshot already loading");
                return false;
            }
            self.supersede(&mut current, ScreenshotKind::Processed)
        };
        let this = self.clone();
        tokio::spawn(async move {
            this.run(ticket).await;
        });
        true
    }

    /// Cancels whatever refresh is running and registers a new one.
    fn supersede(&self, current: &mut Option<Pending>, kind: ScreenshotKind) -> Ticket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = current.replace(Pending {
            id,
            kind,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        Ticket { id, kind, token }
    }

    async fn run(&self, ticket: Ticket) -> RefreshOutcome {
        let _finish = Finish {
            refresher: self,
            id: ticket.id,
        };
        let Ticket { kind, token, .. } = ticket;

        match self.load(kind, &token).await {
            Ok(frame) => return self.show(kind, frame, &token),
            Err(DashboardError::Cancelled) => return RefreshOutcome::Superseded,
            Err(e) if kind == ScreenshotKind::Processed => {
                warn!(error = %e, "processed screenshot failed, falling back to raw");
            }
            Err(e) => {
                error!(error = %e, "raw screenshot failed");
                return self.show_placeholder(&token);
            }
        }

        match self.load(ScreenshotKind::Raw, &token).await {
            Ok(frame) => self.show(ScreenshotKind::Raw, frame, &token),
            Err(DashboardError::Cancelled) => RefreshOutcome::Superseded,
            Err(e) => {
                error!(error = %e, "raw screenshot failed");
                self.show_placeholder(&token)
            }
        }
    }

    async fn load(&self, kind: ScreenshotKind, token: &CancellationToken) -> Result<Frame> {
        tokio::select! {
            _ = token.cancelled() => Err(DashboardError::Cancelled),
            bytes = self.client.screenshot(kind) => decode_frame(&bytes?),
        }
    }

    fn show(&self, kind: ScreenshotKind, frame: Frame, token: &CancellationToken) -> RefreshOutcome {
        if token.is_cancelled() {
            return RefreshOutcome::Superseded;
        }
        debug!(%kind, width = frame.width, height = frame.height, "screenshot loaded");
        self.state.write().screenshot = ScreenshotView::Image {
            kind,
            frame: Arc::new(frame),
        };
        RefreshOutcome::Shown(kind)
    }

    fn show_placeholder(&self, token: &CancellationToken) -> RefreshOutcome {
        if token.is_cancelled() {
            return RefreshOutcome::Superseded;
        }
        let mut state = self.state.write();
        if !state.screenshot.is_placeholder() {
            state.screenshot = ScreenshotView::placeholder();
        }
        RefreshOutcome::Placeholder
    }

    /// First raw load after `initial_delay`, then a refresh of whatever is on
    /// screen every `interval`. A tick that finds a load still running is
    /// skipped rather than cancelling it.
    pub fn spawn_timer(
        self: &Arc<Self>,
        initial_delay: Duration,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(initial_delay) => {}
            }
            this.refresh(ScreenshotKind::Raw).await;

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(pending) = this.pending_kind() {
                            debug!(%pending, "screenshot still loading, skipping tick");
                            continue;
                        }
                        let kind = this.displayed_kind().unwrap_or(ScreenshotKind::Raw);
                        this.refresh(kind).await;
                    }
                }
            }
        })
    }

    /// Animates the placeholder message while no frame is shown.
    pub fn spawn_ellipsis(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let state = self.state.clone();
        tokio::spawn(async move {
            let mut ellipsis = Ellipsis::default();
            let mut ticker = tokio::time::interval(ELLIPSIS_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let message = ellipsis.advance();
                        if let ScreenshotView::Placeholder { message: current } = &mut state.write().screenshot {
                            *current = message;
                        }
                    }
                }
            }
        })
    }
}

fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(Frame {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// "Waiting for frame" followed by 0 to 3 dots, cycling.
#[derive(Debug, Default)]
pub struct Ellipsis {
    dots: usize,
}

impl Ellipsis {
    pub fn advance(&mut self) -> String {
        self.dots = (self.dots + 1) % 4;
        format!("{}{}", WAITING_FOR_FRAME, ".".repeat(self.dots))
    }
}
