mod support;

use automoy_dashboard::api::{GOAL_PATH, PROBE_PATH, TOGGLE_PAUSE_PATH};
use automoy_dashboard::config::DEFAULT_OMNIPARSER_PORT;
use automoy_dashboard::document::Region;
use automoy_dashboard::goal::SubmitOutcome;
use automoy_dashboard::render::{PAUSED_BY_USER, RUNNING};
use automoy_dashboard::screenshot::RefreshOutcome;
use automoy_dashboard::state::{CompanionStatus, OverlayPhase, ScreenshotKind};
use automoy_dashboard::stub::GoalFailure;
use automoy_dashboard::types::OperatorState;
use automoy_dashboard::Dashboard;
use axum::http::StatusCode;
use std::time::Duration;
use support::{closed_port, eventually, harness, test_config};

#[tokio::test]
async fn goal_submit_posts_once_and_clears_input() {
    let h = harness().await;
    h.dashboard.goal.set_input("  open calculator ");

    let outcome = h.dashboard.goal.submit().await;
    assert!(matches!(outcome, SubmitOutcome::Accepted(_)));
    assert_eq!(h.stub.hits(GOAL_PATH), 1);
    assert_eq!(h.stub.goals(), vec!["open calculator".to_string()]);
    assert_eq!(h.dashboard.goal.input(), "");

    let doc = &h.dashboard.document;
    assert_eq!(doc.text(Region::UserGoal).as_deref(), Some("open calculator"));
    assert_eq!(
        doc.text(Region::FormulatedObjective).as_deref(),
        Some("Accomplish: open calculator")
    );
}

#[tokio::test]
async fn whitespace_goal_is_not_sent() {
    let h = harness().await;
    h.dashboard.goal.set_input("   \t ");

    assert_eq!(h.dashboard.goal.submit().await, SubmitOutcome::Empty);
    assert_eq!(h.stub.hits(GOAL_PATH), 0);
    assert_eq!(h.dashboard.goal.input(), "   \t ");
}

#[tokio::test]
async fn rejected_goal_shows_status_and_keeps_input() {
    let h = harness().await;
    h.stub.fail_goals(Some(GoalFailure {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "backend exploded".into(),
    }));
    h.dashboard.goal.set_input("open calculator");

    let SubmitOutcome::Failed(message) = h.dashboard.goal.submit().await else {
        panic!("expected a failed submit");
    };
    assert!(message.starts_with("Error setting goal:"));
    assert!(message.contains("500"));
    assert!(message.contains("backend exploded"));
    assert_eq!(h.stub.hits(GOAL_PATH), 1);
    assert_eq!(h.dashboard.goal.input(), "open calculator");
    assert_eq!(
        h.dashboard.document.text(Region::UserGoal).as_deref(),
        Some(message.as_str())
    );
}

#[tokio::test]
async fn toggle_pause_updates_button_and_operation() {
    let h = harness().await;

    assert!(h.dashboard.pause.toggle().await.unwrap());
    assert!(h.dashboard.pause.is_paused());
    assert_eq!(h.dashboard.pause.face().label, "Resume");
    assert_eq!(
        h.dashboard.document.text(Region::CurrentOperation).as_deref(),
        Some(PAUSED_BY_USER)
    );

    assert!(!h.dashboard.pause.toggle().await.unwrap());
    assert_eq!(h.dashboard.pause.face().label, "Pause");
    assert_eq!(
        h.dashboard.document.text(Region::CurrentOperation).as_deref(),
        Some(RUNNING)
    );
}

#[tokio::test]
async fn concurrent_toggles_end_on_server_state() {
    let h = harness().await;
    // the first request answers late; an unserialized client would apply the
    // second answer first and then overwrite it with the stale one
    h.stub
        .set_toggle_delays(vec![Duration::from_millis(150), Duration::ZERO]);

    let (first, second) = tokio::join!(h.dashboard.pause.toggle(), h.dashboard.pause.toggle());
    assert!(first.unwrap());
    assert!(!second.unwrap());
    assert_eq!(h.stub.hits(TOGGLE_PAUSE_PATH), 2);
    assert_eq!(h.dashboard.pause.is_paused(), h.stub.is_paused());
}

#[tokio::test]
async fn local_pause_message_survives_stale_polls() {
    let h = harness().await;
    h.dashboard.pause.toggle().await.unwrap();
    h.stub.publish(OperatorState {
        current_operation_display: Some("Clicking Start".into()),
        ..Default::default()
    });

    h.dashboard.poller.poll_once().await.unwrap();
    assert_eq!(
        h.dashboard.document.text(Region::CurrentOperation).as_deref(),
        Some(PAUSED_BY_USER)
    );

    h.stub.publish(OperatorState {
        current_operation_display: Some("Paused at step 3".into()),
        ..Default::default()
    });
    h.dashboard.poller.poll_once().await.unwrap();
    assert_eq!(
        h.dashboard.document.text(Region::CurrentOperation).as_deref(),
        Some("Paused at step 3")
    );
}

#[tokio::test]
async fn processed_screenshot_falls_back_to_raw_once() {
    let h = harness().await;
    h.stub.set_screenshot(ScreenshotKind::Processed, None);

    let outcome = h.dashboard.screenshots.refresh(ScreenshotKind::Processed).await;
    assert_eq!(outcome, RefreshOutcome::Shown(ScreenshotKind::Raw));
    assert_eq!(h.stub.hits(ScreenshotKind::Processed.path()), 1);
    assert_eq!(h.stub.hits(ScreenshotKind::Raw.path()), 1);
    assert_eq!(h.dashboard.screenshots.displayed_kind(), Some(ScreenshotKind::Raw));
}

#[tokio::test]
async fn missing_raw_screenshot_shows_placeholder() {
    let h = harness().await;
    h.stub.set_screenshot(ScreenshotKind::Raw, None);

    let outcome = h.dashboard.screenshots.refresh(ScreenshotKind::Raw).await;
    assert_eq!(outcome, RefreshOutcome::Placeholder);
    assert_eq!(h.dashboard.screenshots.displayed_kind(), None);
    assert!(h.dashboard.state.read().screenshot.is_placeholder());
}

#[tokio::test]
async fn processed_screenshot_is_displayed() {
    let h = harness().await;

    let outcome = h.dashboard.screenshots.refresh(ScreenshotKind::Processed).await;
    assert_eq!(outcome, RefreshOutcome::Shown(ScreenshotKind::Processed));
    assert_eq!(h.stub.hits(ScreenshotKind::Raw.path()), 0);
}

#[tokio::test]
async fn slow_processed_load_survives_repeated_hints() {
    let h = harness().await;
    h.stub
        .set_screenshot_delay(ScreenshotKind::Processed, Duration::from_millis(300));
    let snapshot = OperatorState {
        processed_screenshot_available: true,
        ..Default::default()
    };

    // snapshots arrive faster than the processed frame loads
    for _ in 0..20 {
        h.dashboard.panels.apply(&snapshot);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let screenshots = h.dashboard.screenshots.clone();
    assert!(eventually(|| screenshots.displayed_kind() == Some(ScreenshotKind::Processed)).await);
    assert_eq!(h.stub.hits(ScreenshotKind::Processed.path()), 1);
    assert_eq!(screenshots.pending_kind(), None);
}

#[tokio::test]
async fn newer_refresh_supersedes_older_one() {
    let h = harness().await;
    h.stub
        .set_screenshot_delay(ScreenshotKind::Raw, Duration::from_millis(100));
    h.stub
        .set_screenshot_delay(ScreenshotKind::Processed, Duration::from_millis(300));
    let screenshots = &h.dashboard.screenshots;

    let (older, newer, midway) = tokio::join!(
        screenshots.refresh(ScreenshotKind::Raw),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            screenshots.refresh(ScreenshotKind::Processed).await
        },
        async {
            // the raw frame would have landed by now had it not been cancelled
            tokio::time::sleep(Duration::from_millis(200)).await;
            h.dashboard.state.read().screenshot.is_placeholder()
        },
    );

    assert_eq!(older, RefreshOutcome::Superseded);
    assert_eq!(newer, RefreshOutcome::Shown(ScreenshotKind::Processed));
    assert!(midway);
    assert_eq!(screenshots.displayed_kind(), Some(ScreenshotKind::Processed));
}

#[tokio::test]
async fn bootstrap_reads_companion_port() {
    let h = harness().await;
    h.stub.set_omniparser_port(5100);

    assert_eq!(h.dashboard.bootstrap().await, 5100);
    assert_eq!(h.dashboard.state.read().omniparser_port, 5100);
}

#[tokio::test]
async fn bootstrap_falls_back_when_backend_is_down() {
    let port = closed_port().await;
    let dashboard = Dashboard::new(test_config(&format!("http://127.0.0.1:{port}"))).unwrap();

    assert_eq!(dashboard.bootstrap().await, DEFAULT_OMNIPARSER_PORT);
}

#[tokio::test]
async fn ready_companion_hides_loading_screen_once() {
    let h = harness().await;
    assert_eq!(h.dashboard.bootstrap().await, h.port);
    assert_eq!(h.dashboard.loading.phase(), OverlayPhase::Visible);

    assert_eq!(h.dashboard.companion.check().await, Some(CompanionStatus::Ready));
    assert!(h.dashboard.loading.is_hidden());
    assert!(h.dashboard.state.read().omniparser_ready);
    assert_eq!(
        h.dashboard.document.text(Region::CompanionStatus).as_deref(),
        Some("OmniParser Ready")
    );

    assert_eq!(h.dashboard.companion.check().await, Some(CompanionStatus::Ready));
    assert_eq!(h.stub.hits(PROBE_PATH), 2);

    let loading = h.dashboard.loading.clone();
    assert!(eventually(|| loading.phase() == OverlayPhase::Removed).await);
}

#[tokio::test]
async fn failing_companion_reports_error() {
    let h = harness().await;
    h.dashboard.bootstrap().await;
    h.stub.set_probe_status(StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(h.dashboard.companion.check().await, Some(CompanionStatus::Error));
    assert!(!h.dashboard.loading.is_hidden());
    assert_eq!(
        h.dashboard.document.text(Region::CompanionStatus).as_deref(),
        Some("OmniParser Error")
    );
}

#[tokio::test]
async fn unreachable_companion_reports_offline() {
    let h = harness().await;
    h.dashboard.state.write().omniparser_port = closed_port().await;

    assert_eq!(h.dashboard.companion.check().await, Some(CompanionStatus::Offline));
    assert!(!h.dashboard.state.read().omniparser_ready);
    assert!(!h.dashboard.loading.is_hidden());
    assert_eq!(
        h.dashboard.document.text(Region::CompanionStatus).as_deref(),
        Some("OmniParser Offline")
    );
}

#[tokio::test]
async fn started_dashboard_renders_and_shuts_down() {
    let h = harness().await;
    h.stub.publish(OperatorState {
        user_goal: Some("search the web".into()),
        ..Default::default()
    });

    h.dashboard.bootstrap().await;
    h.dashboard.start();

    let doc = h.dashboard.document.clone();
    assert!(eventually(|| doc.text(Region::UserGoal).as_deref() == Some("search the web")).await);
    let loading = h.dashboard.loading.clone();
    assert!(eventually(|| loading.is_hidden()).await);

    h.dashboard.shutdown().await;
}
