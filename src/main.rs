use anyhow::{Result, anyhow};
use automoy_dashboard::config::{
    BACKEND_URL_ENV, COMPANION_HOST_ENV, DEFAULT_BACKEND_URL, DEFAULT_COMPANION_HOST,
};
use automoy_dashboard::document::Document;
use automoy_dashboard::render::apply_snapshot;
use automoy_dashboard::ui::DashboardApp;
use automoy_dashboard::{Dashboard, DashboardConfig};
use clap::Parser;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Dashboard for the Automoy automation backend
#[derive(Parser, Debug)]
#[command(name = "automoy-dashboard")]
#[command(about = "Shows what the Automoy operator is doing and lets you steer it")]
struct Args {
    /// Base URL of the Automoy backend
    #[arg(long, env = BACKEND_URL_ENV, default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Host of the OmniParser companion service
    #[arg(long, env = COMPANION_HOST_ENV, default_value = DEFAULT_COMPANION_HOST)]
    companion_host: String,

    /// Longest time the loading screen may stay up, in seconds
    #[arg(long, default_value_t = 20)]
    safety_timeout_secs: u64,

    /// Rely on polling only; do not open the push stream
    #[arg(long)]
    no_push: bool,

    /// Run without a window and log every panel change
    #[arg(long, conflicts_with = "once")]
    headless: bool,

    /// Fetch the operator state once, print it as HTML and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    fn config(&self) -> DashboardConfig {
        let mut config =
            DashboardConfig::new(&self.backend_url).with_companion_host(&self.companion_host);
        config.safety_timeout = Duration::from_secs(self.safety_timeout_secs);
        config.push_enabled = !self.no_push;
        config
    }
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.config();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    if args.once {
        return runtime.block_on(print_snapshot(config));
    }

    let dashboard = runtime.block_on(async {
        let dashboard = Arc::new(Dashboard::new(config)?);
        dashboard.bootstrap().await;
        dashboard.start();
        Ok::<_, anyhow::Error>(dashboard)
    })?;

    if args.headless {
        runtime.block_on(run_headless(dashboard.clone()));
    } else {
        run_window(dashboard.clone(), runtime.handle().clone())?;
    }

    runtime.block_on(dashboard.shutdown());
    Ok(())
}

async fn print_snapshot(config: DashboardConfig) -> Result<()> {
    let client = automoy_dashboard::api::BackendClient::new(&config)?;
    let snapshot = client.operator_state().await?;
    let document = Document::new();
    apply_snapshot(&document, &snapshot, false);
    print!("{}", document.to_html());
    Ok(())
}

async fn run_headless(dashboard: Arc<Dashboard>) {
    info!("running headless, press Ctrl-C to stop");
    let mut events = dashboard.document.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => info!(
                    region = event.region.element_id(),
                    "{}",
                    event.content.plain_text()
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed panel updates"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn run_window(dashboard: Arc<Dashboard>, runtime: tokio::runtime::Handle) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Automoy",
        native_options,
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(cc, dashboard, runtime)))),
    )
    .map_err(|e| anyhow!("window error: {e}"))
}
