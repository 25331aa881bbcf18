//! Health probe for the companion screen-parsing service (OmniParser).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::BackendClient;
use crate::document::{Document, Region};
use crate::inflight::InFlight;
use crate::loading::LoadingScreen;
use crate::state::{CompanionStatus, SharedState};

pub const STARTUP_INTERVAL: Duration = Duration::from_secs(2);
pub const STARTUP_ATTEMPTS: u32 = 15;
pub const STEADY_INTERVAL: Duration = Duration::from_secs(5);

pub struct CompanionProbe {
    client: Arc<BackendClient>,
    document: Arc<Document>,
    state: SharedState,
    loading: Arc<LoadingScreen>,
    ready_dispatched: AtomicBool,
    in_flight: InFlight,
}

impl CompanionProbe {
    pub fn new(
        client: Arc<BackendClient>,
        document: Arc<Document>,
        state: SharedState,
        loading: Arc<LoadingScreen>,
    ) -> Self {
        Self {
            client,
            document,
            state,
            loading,
            ready_dispatched: AtomicBool::new(false),
            in_flight: InFlight::new(),
        }
    }

    /// Probes once and updates the indicator. `None` if a probe is already
    /// running.
    pub async fn check(&self) -> Option<CompanionStatus> {
        let _guard = self.in_flight.try_begin()?;
        let port = self.state.read().omniparser_port;
        debug!(port, "checking OmniParser status");

        let status = match self.client.probe_companion(port).await {
            Ok(code) if code.is_success() => CompanionStatus::Ready,
            Ok(code) => {
                debug!(%code, "OmniParser returned error status");
                CompanionStatus::Error
            }
            Err(e) => {
                debug!(error = %e, "OmniParser connection failed");
                CompanionStatus::Offline
            }
        };

        {
            let mut state = self.state.write();
            state.companion_status = status;
            match status {
                CompanionStatus::Ready => state.omniparser_ready = true,
                CompanionStatus::Offline => state.omniparser_ready = false,
                _ => {}
            }
        }
        self.document.set_text(Region::CompanionStatus, status.label());

        if status == CompanionStatus::Ready && !self.ready_dispatched.swap(true, Ordering::SeqCst) {
            info!("OmniParser ready");
            self.loading.hide("OmniParser is ready");
        }
        Some(status)
    }

    /// Fast checks during startup, then a steady slower cadence that keeps
    /// following restarts and crashes of the service.
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(probe_schedule(
            move || {
                let this = this.clone();
                async move { this.check().await }
            },
            shutdown,
        ))
    }
}

/// Runs `check` every [`STARTUP_INTERVAL`] until it reports ready or
/// [`STARTUP_ATTEMPTS`] run out, then every [`STEADY_INTERVAL`].
async fn probe_schedule<F, Fut>(mut check: F, shutdown: CancellationToken)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<CompanionStatus>>,
{
    let mut startup = tokio::time::interval(STARTUP_INTERVAL);
    for attempt in 1..=STARTUP_ATTEMPTS {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = startup.tick() => {}
        }
        debug!(attempt, max = STARTUP_ATTEMPTS, "startup OmniParser check");
        if check().await == Some(CompanionStatus::Ready) {
            break;
        }
    }
    debug!("startup OmniParser checking complete");

    let mut steady =
        tokio::time::interval_at(tokio::time::Instant::now() + STEADY_INTERVAL, STEADY_INTERVAL);
    steady.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = steady.tick() => {
                check().await;
            }
        }
    }
}
