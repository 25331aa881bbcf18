use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::api::BackendClient;
use crate::error::Result;
use crate::inflight::InFlight;
use crate::panels::Panels;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The previous request was still running.
    Skipped,
    Applied { changed: usize },
}

/// Fetches the full operator snapshot on a fixed interval.
pub struct StatePoller {
    client: Arc<BackendClient>,
    panels: Panels,
    in_flight: InFlight,
    interval: Duration,
}

impl StatePoller {
    pub fn new(client: Arc<BackendClient>, panels: Panels, interval: Duration) -> Self {
        Self {
            client,
            panels,
            in_flight: InFlight::new(),
            interval,
        }
    }

    /// One fetch-and-render round. On error the display is left as it was.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let Some(_guard) = self.in_flight.try_begin() else {
            debug!("state request still in flight, skipping tick");
            return Ok(PollOutcome::Skipped);
        };
        let snapshot = self.client.operator_state().await?;
        let changed = self.panels.apply(&snapshot);
        Ok(PollOutcome::Applied { changed })
    }

    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = this.poll_once().await {
                            error!(error = %e, "error fetching operator state");
                        }
                    }
                }
            }
        })
    }
}
