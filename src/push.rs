//! Push-update listener for `/stream_operator_updates`.
//!
//! Every SSE message carries a full [`OperatorState`] snapshot. The listener
//! reconnects with exponential backoff whenever the stream errors or ends.

use eventsource_stream::Eventsource;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::BackendClient;
use crate::error::{DashboardError, Result};
use crate::panels::Panels;
use crate::types::OperatorState;

/// Exponential reconnect delay, doubling up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

pub struct PushListener {
    client: Arc<BackendClient>,
    panels: Panels,
    reconnect_initial: Duration,
    reconnect_max: Duration,
}

impl PushListener {
    pub fn new(
        client: Arc<BackendClient>,
        panels: Panels,
        reconnect_initial: Duration,
        reconnect_max: Duration,
    ) -> Self {
        Self {
            client,
            panels,
            reconnect_initial,
            reconnect_max,
        }
    }

    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run(shutdown).await })
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        let mut backoff = Backoff::new(self.reconnect_initial, self.reconnect_max);
        loop {
            let result = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.listen(&mut backoff) => result,
            };
            match result {
                Ok(()) => info!("operator update stream ended"),
                Err(e) => warn!(error = %e, "operator update stream failed"),
            }

            let delay = backoff.next_delay();
            debug!(?delay, "reconnecting to operator update stream");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        debug!("push listener stopped");
    }

    /// Reads one connection until it ends.
    async fn listen(&self, backoff: &mut Backoff) -> Result<()> {
        let response = self.client.open_update_stream().await?;
        info!("connected to operator update stream");
        backoff.reset();

        let stream = response.bytes_stream().eventsource();
        let mut stream = Box::pin(stream);
        while let Some(event) = stream.next().await {
            let event = event.map_err(|e| DashboardError::Stream(e.to_string()))?;
            self.handle(&event.data);
        }
        Ok(())
    }

    /// Applies one message. Malformed payloads are logged and dropped.
    pub fn handle(&self, data: &str) -> bool {
        match serde_json::from_str::<OperatorState>(data) {
            Ok(snapshot) => {
                let changed = self.panels.apply(&snapshot);
                debug!(changed, "applied pushed snapshot");
                true
            }
            Err(e) => {
                warn!(error = %e, raw = %data, "dropping malformed update");
                false
            }
        }
    }
}
