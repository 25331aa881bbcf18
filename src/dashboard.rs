use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::BackendClient;
use crate::companion::CompanionProbe;
use crate::config::{DEFAULT_OMNIPARSER_PORT, DashboardConfig};
use crate::document::Document;
use crate::error::Result;
use crate::goal::GoalForm;
use crate::loading::LoadingScreen;
use crate::panels::Panels;
use crate::pause::PauseControl;
use crate::poller::StatePoller;
use crate::push::PushListener;
use crate::screenshot::ScreenshotRefresher;
use crate::state::{SharedState, UiState};

/// Every component of the dashboard, wired around one client, one document
/// and one UI state.
pub struct Dashboard {
    pub config: DashboardConfig,
    pub client: Arc<BackendClient>,
    pub document: Arc<Document>,
    pub state: SharedState,
    pub loading: Arc<LoadingScreen>,
    pub screenshots: Arc<ScreenshotRefresher>,
    pub panels: Panels,
    pub poller: Arc<StatePoller>,
    pub push: Arc<PushListener>,
    pub goal: Arc<GoalForm>,
    pub pause: Arc<PauseControl>,
    pub companion: Arc<CompanionProbe>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Must be called from inside a tokio runtime.
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let client = Arc::new(BackendClient::new(&config)?);
        let document = Arc::new(Document::new());
        let state = UiState::shared();

        let loading = Arc::new(LoadingScreen::new(state.clone()));
        let screenshots = Arc::new(ScreenshotRefresher::new(client.clone(), state.clone()));
        let panels = Panels::new(document.clone(), state.clone(), screenshots.clone());
        let poller = Arc::new(StatePoller::new(
            client.clone(),
            panels.clone(),
            config.poll_interval,
        ));
        let push = Arc::new(PushListener::new(
            client.clone(),
            panels.clone(),
            config.reconnect_initial,
            config.reconnect_max,
        ));
        let goal = Arc::new(GoalForm::new(client.clone(), document.clone(), state.clone()));
        let pause = Arc::new(PauseControl::new(client.clone(), document.clone(), state.clone()));
        let companion = Arc::new(CompanionProbe::new(
            client.clone(),
            document.clone(),
            state.clone(),
            loading.clone(),
        ));

        Ok(Self {
            config,
            client,
            document,
            state,
            loading,
            screenshots,
            panels,
            poller,
            push,
            goal,
            pause,
            companion,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Loads `/config`. Falls back to the default companion port.
    pub async fn bootstrap(&self) -> u16 {
        let port = match self.client.fetch_config().await {
            Ok(config) => config.omniparser_port.unwrap_or(DEFAULT_OMNIPARSER_PORT),
            Err(e) => {
                warn!(error = %e, "failed to load configuration, using defaults");
                DEFAULT_OMNIPARSER_PORT
            }
        };
        self.state.write().omniparser_port = port;
        info!(omniparser_port = port, "configuration loaded");
        port
    }

    /// Starts every background task.
    pub fn start(&self) {
        let config = &self.config;
        let shutdown = &self.shutdown;
        let mut tasks = self.tasks.lock();

        tasks.push(
            self.loading
                .arm_safety_timeout(config.safety_timeout, shutdown.child_token()),
        );
        tasks.push(self.poller.spawn(shutdown.child_token()));
        if config.push_enabled {
            tasks.push(self.push.spawn(shutdown.child_token()));
        }
        tasks.push(self.screenshots.spawn_timer(
            config.initial_screenshot_delay,
            config.screenshot_interval,
            shutdown.child_token(),
        ));
        tasks.push(self.screenshots.spawn_ellipsis(shutdown.child_token()));
        tasks.push(self.companion.spawn(shutdown.child_token()));
        info!(backend = %self.client.base_url(), "dashboard started");
    }

    /// Cancels every task and waits for them to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        info!("dashboard stopped");
    }
}
