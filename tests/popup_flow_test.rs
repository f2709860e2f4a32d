// End-to-end popup flows against the in-memory host
//
// All tests run on tokio's paused clock so timeouts, liveness polls and
// retry delays are driven explicitly with `advance`.

use popup_auth::testing::constants::{FOREIGN_ORIGIN, TEST_ORIGIN};
use popup_auth::testing::{
    assert_cancelled, assert_cleanup_complete, assert_error_kind, assert_navigated_to,
    assert_no_navigation, assert_no_notices, assert_single_notice, assert_success_for,
    MockPopupHost, PopupMessageBuilder, RecordingLoginDispatcher, RecordingNotifier,
    TestFixtures, TestHarness,
};
use popup_auth::{
    AuthErrorKind, AuthOutcome, CancelReason, CoordinatorState, NotificationLevel,
    PopupCoordinator, ProviderRegistry, StartError, UserProfile,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const LIVENESS: Duration = Duration::from_millis(1000);
const RETRY_DELAY: Duration = Duration::from_millis(500);
const TIMEOUT: Duration = Duration::from_secs(300);

#[tokio::test(start_paused = true)]
async fn test_successful_sign_in_logs_in_and_navigates_home() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.settle().await;

    let opened = h.host.last_window().expect("popup opened");
    assert_eq!(opened.url.as_str(), "http://localhost:5000/api/auth/google");
    assert_eq!(opened.name, "oauth_popup");
    assert_eq!(
        opened.geometry.features(),
        "width=500,height=600,left=390,top=100,scrollbars=yes,resizable=yes"
    );
    assert_eq!(h.host.active_listeners(), 1);

    let delivered = h.post_from_backend(json!({
        "type": "AUTH_SUCCESS",
        "data": { "token": "tok1", "user": { "role": "student" } },
        "provider": "google"
    }));
    assert_eq!(delivered, 1);
    h.settle().await;

    let outcome = h.outcomes.try_next().expect("one outcome");
    assert_success_for(&outcome, "google");
    assert!(h.outcomes.try_next().is_none());
    assert_cleanup_complete(&h.host, &h.coordinator);
    assert_eq!(opened.window.close_calls(), 1);

    h.handler.handle(&outcome).await;
    let requests = h.login.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].token, "tok1");
    assert!(requests[0].remember_me);
    assert_single_notice(&h.notifier, NotificationLevel::Success, "Google");
    assert_navigated_to(&h.navigator, "/");
}

#[tokio::test(start_paused = true)]
async fn test_admin_sign_in_navigates_to_dashboard() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("github"));
    h.post_from_backend(PopupMessageBuilder::success().with_role("admin").build());
    h.settle().await;

    let outcome = h.outcomes.try_next().expect("one outcome");
    // No provider in the payload: the session's provider applies
    assert_success_for(&outcome, "github");

    h.handler.handle(&outcome).await;
    assert_navigated_to(&h.navigator, "/admin/dashboard");
}

#[tokio::test(start_paused = true)]
async fn test_blocked_popup_reports_once_and_registers_nothing() {
    let mut h = TestFixtures::harness();
    h.host.return_closed_handles(true);

    assert!(!h.coordinator.start_authorization("github"));
    h.settle().await;

    assert_single_notice(&h.notifier, NotificationLevel::Error, "Popup blocked");
    assert_eq!(h.host.active_listeners(), 0);
    assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
    assert!(h.outcomes.try_next().is_none());

    h.notifier.clear();
    h.host.return_closed_handles(false);
    h.host.block_popups(true);
    assert_eq!(
        h.coordinator.try_start("github"),
        Err(StartError::PopupBlocked)
    );
    // try_start reports without a notice
    assert_no_notices(&h.notifier);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_provider_is_rejected_before_opening() {
    let h = TestFixtures::harness();

    assert!(!h.coordinator.start_authorization("myspace"));
    assert_eq!(h.host.open_count(), 0);
    assert_single_notice(&h.notifier, NotificationLevel::Error, "myspace");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_error_warns_without_navigation() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(json!({
        "type": "AUTH_ERROR",
        "error": "Too many attempts",
        "errorType": "rate_limit_exceeded",
        "provider": "google"
    }));
    h.settle().await;

    let outcome = h.outcomes.try_next().expect("one outcome");
    assert_error_kind(&outcome, AuthErrorKind::RateLimited);
    assert_cleanup_complete(&h.host, &h.coordinator);

    h.handler.handle(&outcome).await;
    assert_single_notice(&h.notifier, NotificationLevel::Warning, "Too many attempts");
    assert_no_navigation(&h.navigator);
    assert!(h.login.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_access_denied_is_informational() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(PopupMessageBuilder::error("access_denied").build());
    h.settle().await;

    let outcome = h.outcomes.try_next().expect("one outcome");
    assert_error_kind(&outcome, AuthErrorKind::AccessDenied);
    h.handler.handle(&outcome).await;
    assert_single_notice(&h.notifier, NotificationLevel::Info, "cancelled");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_force_closes_popup() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.settle().await;
    let opened = h.host.last_window().expect("popup opened");

    h.advance(TIMEOUT - Duration::from_secs(1)).await;
    assert!(h.outcomes.try_next().is_none());
    assert!(opened.window.is_open());

    h.advance(Duration::from_secs(1)).await;
    let outcome = h.outcomes.try_next().expect("timeout outcome");
    assert_error_kind(&outcome, AuthErrorKind::Timeout);
    assert_eq!(opened.window.close_calls(), 1);
    assert_cleanup_complete(&h.host, &h.coordinator);

    h.handler.handle(&outcome).await;
    assert_single_notice(&h.notifier, NotificationLevel::Error, "timed out");
}

#[tokio::test(start_paused = true)]
async fn test_user_closing_popup_is_silent() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.settle().await;
    let opened = h.host.last_window().expect("popup opened");
    opened.window.simulate_user_close();

    h.advance(LIVENESS).await;

    let outcome = h.outcomes.try_next().expect("cancellation outcome");
    assert_cancelled(&outcome, CancelReason::WindowClosed);
    // Already closed by the user; the coordinator does not close it again
    assert_eq!(opened.window.close_calls(), 0);
    assert_cleanup_complete(&h.host, &h.coordinator);

    h.handler.handle(&outcome).await;
    assert_no_notices(&h.notifier);
    assert_no_navigation(&h.navigator);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_refused_while_active() {
    let h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    assert!(!h.coordinator.start_authorization("github"));
    assert!(!h.coordinator.start_authorization("google"));
    assert_eq!(
        h.coordinator.try_start("github"),
        Err(StartError::SessionActive)
    );

    assert_eq!(h.host.open_count(), 1);
    assert_no_notices(&h.notifier);
    match h.coordinator.state() {
        CoordinatorState::Active { provider, .. } => assert_eq!(provider, "google"),
        other => panic!("expected active session, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_foreign_origin_messages_are_ignored() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.settle().await;

    let payloads = [
        PopupMessageBuilder::success().build(),
        PopupMessageBuilder::error("access_denied").build(),
        PopupMessageBuilder::retry().with_provider("github").build(),
        json!({ "type": "SOMETHING_ELSE" }),
        json!("AUTH_SUCCESS"),
    ];
    for payload in payloads {
        h.host.post_message(FOREIGN_ORIGIN, payload.clone());
        h.host.post_message("null", payload.clone());
        h.host.post_message("http://localhost:5001", payload);
    }
    h.settle().await;

    assert!(h.outcomes.try_next().is_none());
    assert!(h.coordinator.is_active());
    assert_eq!(h.host.open_count(), 1);
    assert_eq!(h.host.active_listeners(), 1);

    // The real backend can still finish the attempt
    h.post_from_backend(PopupMessageBuilder::success().build());
    h.settle().await;
    assert_success_for(&h.outcomes.try_next().expect("one outcome"), "google");
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_backend_messages_are_ignored() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(json!({ "type": "AUTH_PING" }));
    h.post_from_backend(PopupMessageBuilder::success().with_token("").build());
    h.settle().await;

    assert!(h.outcomes.try_next().is_none());
    assert!(h.coordinator.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_nothing_changes_after_terminal_message() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(PopupMessageBuilder::success().build());
    h.post_from_backend(PopupMessageBuilder::error("access_denied").build());
    h.settle().await;

    assert_success_for(&h.outcomes.try_next().expect("one outcome"), "google");
    assert_eq!(h.post_from_backend(PopupMessageBuilder::retry().build()), 0);

    h.advance(TIMEOUT).await;
    assert!(h.outcomes.try_next().is_none());
    assert_eq!(h.host.open_count(), 1);
    assert_cleanup_complete(&h.host, &h.coordinator);
}

#[tokio::test(start_paused = true)]
async fn test_retry_reopens_requested_provider_after_delay() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(PopupMessageBuilder::retry().with_provider("github").build());
    h.settle().await;

    assert_eq!(
        h.coordinator.state(),
        CoordinatorState::RetryPending {
            provider: "github".to_string()
        }
    );
    assert_eq!(h.host.open_count(), 1);
    assert_eq!(h.host.open_windows(), 0);
    assert_eq!(h.host.active_listeners(), 0);
    assert!(h.outcomes.try_next().is_none());

    h.advance(RETRY_DELAY - Duration::from_millis(1)).await;
    assert_eq!(h.host.open_count(), 1);

    h.advance(Duration::from_millis(1)).await;
    assert_eq!(h.host.open_count(), 2);
    let reopened = h.host.last_window().expect("popup reopened");
    assert_eq!(reopened.url.path(), "/api/auth/github");
    assert!(h.coordinator.is_active());

    h.advance(RETRY_DELAY * 4).await;
    assert_eq!(h.host.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_without_provider_reuses_session_provider() {
    let h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(PopupMessageBuilder::retry().build());
    h.settle().await;
    h.advance(RETRY_DELAY).await;

    assert_eq!(h.host.open_count(), 2);
    let reopened = h.host.last_window().expect("popup reopened");
    assert_eq!(reopened.url.path(), "/api/auth/google");
}

#[tokio::test(start_paused = true)]
async fn test_retry_declined_when_auto_retry_disabled() {
    let mut h = TestFixtures::harness_without_retry();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(PopupMessageBuilder::retry().with_provider("github").build());
    h.settle().await;

    let outcome = h.outcomes.try_next().expect("one outcome");
    assert_cancelled(&outcome, CancelReason::RetryDeclined);
    assert_eq!(outcome.provider(), "github");

    h.advance(RETRY_DELAY * 2).await;
    assert_eq!(h.host.open_count(), 1);
    assert_cleanup_complete(&h.host, &h.coordinator);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_pending_retry() {
    let h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(PopupMessageBuilder::retry().build());
    h.settle().await;

    assert!(h.coordinator.cancel());
    h.advance(RETRY_DELAY * 2).await;
    assert_eq!(h.host.open_count(), 1);
    assert_cleanup_complete(&h.host, &h.coordinator);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_start_supersedes_pending_retry() {
    let h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(PopupMessageBuilder::retry().build());
    h.settle().await;

    assert!(h.coordinator.start_authorization("github"));
    h.advance(RETRY_DELAY * 2).await;

    assert_eq!(h.host.open_count(), 2);
    match h.coordinator.state() {
        CoordinatorState::Active { provider, .. } => assert_eq!(provider, "github"),
        other => panic!("expected active session, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_closes_active_popup() {
    let mut h = TestFixtures::harness();

    assert!(!h.coordinator.cancel());
    assert!(h.coordinator.start_authorization("google"));
    h.settle().await;
    assert_eq!(h.coordinator.live_sessions(), 1);

    assert!(h.coordinator.cancel());
    h.settle().await;

    assert_cancelled(
        &h.outcomes.try_next().expect("one outcome"),
        CancelReason::Caller,
    );
    assert_cleanup_complete(&h.host, &h.coordinator);

    // Idle again: a new attempt may start right away
    assert!(h.coordinator.start_authorization("github"));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_coordinator_releases_everything() {
    let TestHarness {
        host,
        coordinator,
        mut outcomes,
        ..
    } = TestFixtures::harness();

    assert!(coordinator.start_authorization("google"));
    tokio::task::yield_now().await;
    assert_eq!(host.active_listeners(), 1);

    drop(coordinator);
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }

    assert_eq!(host.open_windows(), 0);
    assert_eq!(host.active_listeners(), 0);
    assert_cancelled(
        &outcomes.next().await.expect("cancellation outcome"),
        CancelReason::Caller,
    );
    assert!(outcomes.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_process_handles_outcomes_until_coordinator_is_gone() {
    let TestHarness {
        host,
        notifier,
        navigator,
        login,
        coordinator,
        mut outcomes,
        handler,
    } = TestHarness::with_login(&TestFixtures::settings(), RecordingLoginDispatcher::new());

    assert!(coordinator.start_authorization("google"));
    host.post_message(TEST_ORIGIN, PopupMessageBuilder::success().build());
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
    drop(coordinator);

    handler.process(&mut outcomes).await;

    assert_eq!(login.requests().len(), 1);
    assert_single_notice(&notifier, NotificationLevel::Success, "Google");
    assert_navigated_to(&navigator, "/");
}

#[tokio::test(start_paused = true)]
async fn test_failed_login_dispatch_shows_one_error() {
    let mut h =
        TestHarness::with_login(&TestFixtures::settings(), RecordingLoginDispatcher::failing());

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(PopupMessageBuilder::success().build());
    h.settle().await;

    let outcome = h.outcomes.try_next().expect("one outcome");
    h.handler.handle(&outcome).await;
    assert_single_notice(&h.notifier, NotificationLevel::Error, "could not be saved");
    assert_no_navigation(&h.navigator);
}

#[tokio::test(start_paused = true)]
async fn test_success_with_null_user_still_signs_in() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.post_from_backend(json!({
        "type": "AUTH_SUCCESS",
        "data": { "token": "tok1", "user": null }
    }));
    h.settle().await;

    match h.outcomes.try_next().expect("one outcome") {
        AuthOutcome::Success {
            token,
            user,
            provider,
        } => {
            assert_eq!(token, "tok1");
            assert_eq!(user, UserProfile::default());
            assert_eq!(provider, "google");
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_cleanup_complete(&h.host, &h.coordinator);
}

#[tokio::test(start_paused = true)]
async fn test_restart_right_after_cancel() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.settle().await;

    // Same tick: the cancelled session has not run yet
    assert!(h.coordinator.cancel());
    assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
    assert!(h.coordinator.start_authorization("github"));
    assert_no_notices(&h.notifier);
    h.settle().await;

    let outcome = h.outcomes.try_next().expect("cancellation outcome");
    assert_cancelled(&outcome, CancelReason::Caller);
    assert_eq!(outcome.provider(), "google");
    assert!(h.outcomes.try_next().is_none());

    assert_eq!(h.host.open_count(), 2);
    assert_eq!(h.host.open_windows(), 1);
    assert_eq!(h.host.active_listeners(), 1);
    assert_eq!(h.coordinator.live_sessions(), 1);
    match h.coordinator.state() {
        CoordinatorState::Active { provider, .. } => assert_eq!(provider, "github"),
        other => panic!("expected active session, got {other:?}"),
    }

    h.post_from_backend(PopupMessageBuilder::success().build());
    h.settle().await;
    assert_success_for(&h.outcomes.try_next().expect("one outcome"), "github");
    assert_cleanup_complete(&h.host, &h.coordinator);
}

#[tokio::test(start_paused = true)]
async fn test_ignored_messages_do_not_hold_off_timeout() {
    let mut h = TestFixtures::harness();

    assert!(h.coordinator.start_authorization("google"));
    h.settle().await;
    h.advance(TIMEOUT - Duration::from_secs(1)).await;

    for _ in 0..16 {
        h.host
            .post_message(FOREIGN_ORIGIN, PopupMessageBuilder::success().build());
    }
    // Queued behind the noise and only seen after the deadline has passed
    h.post_from_backend(PopupMessageBuilder::success().build());
    h.advance(Duration::from_secs(1)).await;

    let outcome = h.outcomes.try_next().expect("timeout outcome");
    assert_error_kind(&outcome, AuthErrorKind::Timeout);
    assert!(h.outcomes.try_next().is_none());
    assert_cleanup_complete(&h.host, &h.coordinator);
}

#[tokio::test(start_paused = true)]
async fn test_far_future_timings_do_not_wedge_coordinator() {
    let host = MockPopupHost::new();
    let mut config = TestFixtures::config();
    config.timeout = Duration::MAX;
    config.liveness_interval = Duration::MAX;
    let (coordinator, mut outcomes) = PopupCoordinator::new(
        Arc::new(host.clone()),
        ProviderRegistry::default(),
        config,
        Arc::new(RecordingNotifier::new()),
    );

    assert!(coordinator.start_authorization("google"));
    tokio::task::yield_now().await;
    assert_eq!(coordinator.live_sessions(), 1);

    host.post_message(TEST_ORIGIN, PopupMessageBuilder::success().build());
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
    assert_success_for(&outcomes.try_next().expect("one outcome"), "google");
    assert_cleanup_complete(&host, &coordinator);

    assert!(coordinator.start_authorization("github"));
}
