//! Custom assertion helpers for popup tests
//!
//! These check the properties every attempt must end with: resources
//! released, exactly one notice, the right navigation.

use crate::authentication::traits::NotificationLevel;
use crate::models::{AuthErrorKind, AuthOutcome, CancelReason};
use crate::popup::coordinator::{CoordinatorState, PopupCoordinator};
use crate::settings::PopupAuthSettings;

use super::mock::{MockPopupHost, RecordingNavigator, RecordingNotifier};

/// Assert that no window, listener or timer of any session is left behind
///
/// # Panics
///
/// Panics if a popup is still open, a listener is still registered, a
/// session still holds resources, or the coordinator is not idle.
pub fn assert_cleanup_complete(host: &MockPopupHost, coordinator: &PopupCoordinator) {
    assert_eq!(host.open_windows(), 0, "Expected every popup to be closed");
    assert_eq!(
        host.active_listeners(),
        0,
        "Expected every message listener to be removed"
    );
    assert_eq!(
        coordinator.live_sessions(),
        0,
        "Expected no session to hold resources"
    );
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
}

/// Assert that exactly one notice of `level` was shown, containing `fragment`
///
/// # Panics
///
/// Panics if the notifier holds anything other than that single notice.
pub fn assert_single_notice(notifier: &RecordingNotifier, level: NotificationLevel, fragment: &str) {
    let notices = notifier.notifications();
    assert_eq!(notices.len(), 1, "Expected exactly one notice, got {notices:?}");
    assert_eq!(notices[0].level, level, "Unexpected notice level: {notices:?}");
    assert!(
        notices[0].message.contains(fragment),
        "Expected notice to contain '{fragment}', got '{}'",
        notices[0].message
    );
}

/// # Panics
///
/// Panics if any notice was shown.
pub fn assert_no_notices(notifier: &RecordingNotifier) {
    let notices = notifier.notifications();
    assert!(notices.is_empty(), "Expected no notices, got {notices:?}");
}

/// Assert a single history-replacing navigation to `path`
///
/// # Panics
///
/// Panics if there was no navigation, more than one, or it pushed history.
pub fn assert_navigated_to(navigator: &RecordingNavigator, path: &str) {
    assert_eq!(navigator.navigations(), vec![(path.to_string(), true)]);
}

/// # Panics
///
/// Panics if any navigation happened.
pub fn assert_no_navigation(navigator: &RecordingNavigator) {
    let navigations = navigator.navigations();
    assert!(
        navigations.is_empty(),
        "Expected no navigation, got {navigations:?}"
    );
}

/// # Panics
///
/// Panics if `outcome` is not a success for `provider`.
pub fn assert_success_for(outcome: &AuthOutcome, provider: &str) {
    match outcome {
        AuthOutcome::Success { provider: p, .. } => assert_eq!(p, provider),
        other => panic!("Expected success for {provider}, got {other:?}"),
    }
}

/// # Panics
///
/// Panics if `outcome` is not an error of `kind`.
pub fn assert_error_kind(outcome: &AuthOutcome, kind: AuthErrorKind) {
    assert_eq!(
        outcome.error_kind(),
        Some(kind),
        "Expected {kind} error, got {outcome:?}"
    );
}

/// # Panics
///
/// Panics if `outcome` is not a cancellation for `reason`.
pub fn assert_cancelled(outcome: &AuthOutcome, reason: CancelReason) {
    match outcome {
        AuthOutcome::Cancelled { reason: r, .. } => assert_eq!(*r, reason),
        other => panic!("Expected cancellation ({reason:?}), got {other:?}"),
    }
}

/// Assert that settings pass validation and offer at least one provider
///
/// # Panics
///
/// Panics if validation fails or no provider is enabled.
pub fn assert_valid_settings(settings: &PopupAuthSettings) {
    assert!(
        settings.validate().is_ok(),
        "Expected settings to validate: {:?}",
        settings.validate()
    );
    assert!(
        !settings.get_enabled_providers().is_empty(),
        "Expected at least one enabled provider"
    );
}
