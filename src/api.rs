use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::state::ScreenshotKind;
use crate::types::{BackendConfig, GoalRequest, GoalResponse, OperatorState, TogglePauseResponse};

pub const CONFIG_PATH: &str = "/config";
pub const STATE_PATH: &str = "/operator_state";
pub const GOAL_PATH: &str = "/set_goal";
pub const TOGGLE_PAUSE_PATH: &str = "/control/toggle_pause";
pub const STREAM_PATH: &str = "/stream_operator_updates";
pub const PROBE_PATH: &str = "/probe/";

/// Typed access to the Automoy backend and the companion probe.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    companion_host: String,
    request_timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| DashboardError::network(&config.backend_url, e))?;
        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            companion_host: config.companion_host.clone(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn fetch_config(&self) -> Result<BackendConfig> {
        self.get_json(CONFIG_PATH).await
    }

    pub async fn operator_state(&self) -> Result<OperatorState> {
        self.get_json(STATE_PATH).await
    }

    pub async fn set_goal(&self, goal: &str) -> Result<GoalResponse> {
        let url = self.url(GOAL_PATH);
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&GoalRequest {
                goal: goal.to_string(),
            })
            .send()
            .await
            .map_err(|e| DashboardError::network(&url, e))?;
        decode(ensure_success(response).await?).await
    }

    pub async fn toggle_pause(&self) -> Result<TogglePauseResponse> {
        let url = self.url(TOGGLE_PAUSE_PATH);
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| DashboardError::network(&url, e))?;
        decode(ensure_success(response).await?).await
    }

    /// Raw image bytes. The timestamp parameter defeats any cache on the way.
    pub async fn screenshot(&self, kind: ScreenshotKind) -> Result<Vec<u8>> {
        let url = format!("{}?t={}", self.url(kind.path()), unix_millis());
        debug!(%kind, url = %url, "fetching screenshot");
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| DashboardError::network(&url, e))?;
        let response = ensure_success(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DashboardError::network(&url, e))?;
        Ok(bytes.to_vec())
    }

    /// Opens the push channel. The returned response streams SSE frames.
    pub async fn open_update_stream(&self) -> Result<Response> {
        let url = self.url(STREAM_PATH);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| DashboardError::network(&url, e))?;
        ensure_success(response).await
    }

    /// Status code of the companion health endpoint. Connection failures
    /// surface as `Network` errors.
    pub async fn probe_companion(&self, port: u16) -> Result<StatusCode> {
        let url = format!("http://{}:{}{}", self.companion_host, port, PROBE_PATH);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| DashboardError::network(&url, e))?;
        Ok(response.status())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| DashboardError::network(&url, e))?;
        decode(ensure_success(response).await?).await
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DashboardError::Status {
        status,
        body: if body.is_empty() {
            "No error message".to_string()
        } else {
            body
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().to_string();
    let raw = response
        .text()
        .await
        .map_err(|e| DashboardError::network(url, e))?;
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(source) => Err(DashboardError::Parse { raw, source }),
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
