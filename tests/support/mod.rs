#![allow(dead_code)]

use automoy_dashboard::stub::StubBackend;
use automoy_dashboard::{Dashboard, DashboardConfig};
use std::time::Duration;
use tokio::net::TcpListener;

pub struct Harness {
    pub stub: StubBackend,
    pub dashboard: Dashboard,
    pub port: u16,
}

/// Stub backend on a random local port plus a dashboard pointed at it.
/// The stub also answers the companion probe, so its port doubles as the
/// OmniParser port.
pub async fn harness() -> Harness {
    let stub = StubBackend::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = stub.serve(listener).unwrap();
    stub.set_omniparser_port(addr.port());

    let dashboard = Dashboard::new(test_config(&format!("http://{addr}"))).unwrap();
    Harness {
        stub,
        dashboard,
        port: addr.port(),
    }
}

pub fn test_config(backend_url: &str) -> DashboardConfig {
    let mut config = DashboardConfig::new(backend_url).with_companion_host("127.0.0.1");
    config.poll_interval = Duration::from_millis(50);
    config.request_timeout = Duration::from_secs(2);
    config.reconnect_initial = Duration::from_millis(20);
    config.reconnect_max = Duration::from_millis(100);
    config
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Polls `check` for up to two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
