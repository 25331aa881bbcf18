//! Development backend: serves the dashboard endpoints with a scripted
//! operator so the dashboard can be run without the real Automoy stack.

use anyhow::{Result, anyhow};
use automoy_dashboard::stub::StubBackend;
use automoy_dashboard::types::{OperatorState, StepEntry, StepsField};
use clap::Parser;
use serde_json::json;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stub-backend")]
#[command(about = "Scripted stand-in for the Automoy backend")]
struct Args {
    /// First port to try; the next nine are tried if it is taken
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Seconds between scripted operator updates
    #[arg(long, default_value_t = 3)]
    tick_secs: u64,
}

const SCRIPT: &[(&str, &str)] = &[
    ("Taking screenshot", "Capture the current screen"),
    ("Analyzing screen", "Locate the search box"),
    ("Clicking search box", "Click the search box"),
    ("Typing query", "Type the query"),
    ("Pressing Enter", "Submit the search"),
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let stub = StubBackend::new();
    stub.publish(OperatorState {
        operator_status: Some("Idle".into()),
        current_steps_generated: Some(StepsField::List(Vec::new())),
        ..Default::default()
    });

    // Try the requested port, fall back to the next nine if in use
    let mut listener = None;
    for port in args.port..args.port.saturating_add(10) {
        if let Ok(l) = tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
            listener = Some(l);
            break;
        }
    }
    let listener = listener.ok_or_else(|| {
        anyhow!(
            "could not bind to any port {}-{}",
            args.port,
            args.port.saturating_add(9)
        )
    })?;
    let addr = stub.serve(listener)?;
    info!("stub backend running at http://{addr}");

    let mut ticker = tokio::time::interval(Duration::from_secs(args.tick_secs.max(1)));
    let mut step = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if stub.is_paused() || stub.snapshot().user_goal.is_none() {
                    continue;
                }
                let (operation, description) = SCRIPT[step % SCRIPT.len()];
                let past = step
                    .checked_sub(1)
                    .map(|prev| SCRIPT[prev % SCRIPT.len()].0.to_string());
                stub.update(|snapshot| {
                    snapshot.current_operation_display = Some(operation.to_string());
                    snapshot.past_operation_display = past;
                    snapshot.current_thinking_process = Some(format!("Next: {description}"));
                    snapshot.current_steps_generated = Some(StepsField::List(
                        SCRIPT
                            .iter()
                            .map(|(_, d)| StepEntry::Described { description: d.to_string() })
                            .collect(),
                    ));
                    snapshot.current_operations_generated = Some(json!({
                        "operations": [{ "type": "click", "summary": description }]
                    }));
                    snapshot.processed_screenshot_available = step > 0;
                });
                step += 1;
            }
        }
    }

    info!("stub backend stopped");
    Ok(())
}
