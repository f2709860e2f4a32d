//! Test fixtures providing pre-built test objects
//!
//! Settings tuned for fast, deterministic tests and a ready-wired harness
//! with a mock host and recording sinks.

use crate::authentication::factory::{FeedbackSinks, PopupAuthFactory};
use crate::handlers::outcome::OutcomeHandler;
use crate::models::UserProfile;
use crate::oauth::providers::ProviderRegistry;
use crate::popup::coordinator::{AuthOutcomes, CoordinatorConfig, PopupCoordinator};
use crate::settings::PopupAuthSettings;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::constants::{TEST_API_URL, TEST_EMAIL, TEST_ORIGIN, TEST_USER_ID, TEST_USER_NAME};
use super::mock::{MockPopupHost, RecordingLoginDispatcher, RecordingNavigator, RecordingNotifier};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Default settings pointed at the test backend with short timings
    #[must_use]
    pub fn settings() -> PopupAuthSettings {
        let mut settings = PopupAuthSettings::default();
        settings.api.base_url = TEST_API_URL.to_string();
        settings.api.api_suffix = "/api".to_string();
        settings.popup.liveness_interval_ms = 1000;
        settings.popup.timeout_secs = 300;
        settings.popup.retry_delay_ms = 500;
        settings.popup.auto_retry = true;
        settings
    }

    #[must_use]
    pub fn registry() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    /// # Panics
    ///
    /// Panics if the test settings do not produce a config
    #[must_use]
    pub fn config() -> CoordinatorConfig {
        CoordinatorConfig::from_settings(&Self::settings()).expect("test settings are valid")
    }

    /// A regular (non-admin) user
    #[must_use]
    pub fn user() -> UserProfile {
        UserProfile {
            id: Some(TEST_USER_ID.to_string()),
            name: Some(TEST_USER_NAME.to_string()),
            email: Some(TEST_EMAIL.to_string()),
            role: Some("student".to_string()),
            ..UserProfile::default()
        }
    }

    #[must_use]
    pub fn admin() -> UserProfile {
        UserProfile {
            role: Some("admin".to_string()),
            ..Self::user()
        }
    }

    /// Harness built from [`TestFixtures::settings`]
    #[must_use]
    pub fn harness() -> TestHarness {
        TestHarness::from_settings(&Self::settings())
    }

    /// Harness with automatic retry switched off
    #[must_use]
    pub fn harness_without_retry() -> TestHarness {
        let mut settings = Self::settings();
        settings.popup.auto_retry = false;
        TestHarness::from_settings(&settings)
    }
}

/// A coordinator wired to a mock host and recording sinks
pub struct TestHarness {
    pub host: MockPopupHost,
    pub notifier: RecordingNotifier,
    pub navigator: RecordingNavigator,
    pub login: RecordingLoginDispatcher,
    pub coordinator: PopupCoordinator,
    pub outcomes: AuthOutcomes,
    pub handler: OutcomeHandler,
}

impl TestHarness {
    /// # Panics
    ///
    /// Panics if the factory rejects `settings`
    #[must_use]
    pub fn from_settings(settings: &PopupAuthSettings) -> Self {
        Self::with_login(settings, RecordingLoginDispatcher::new())
    }

    /// # Panics
    ///
    /// Panics if the factory rejects `settings`
    #[must_use]
    pub fn with_login(settings: &PopupAuthSettings, login: RecordingLoginDispatcher) -> Self {
        let host = MockPopupHost::new();
        let notifier = RecordingNotifier::new();
        let navigator = RecordingNavigator::new();
        let sinks = FeedbackSinks::new(
            Arc::new(login.clone()),
            Arc::new(notifier.clone()),
            Arc::new(navigator.clone()),
        );
        let (coordinator, outcomes, handler) =
            PopupAuthFactory::create(settings, Arc::new(host.clone()), sinks)
                .expect("test settings are valid");

        Self {
            host,
            notifier,
            navigator,
            login,
            coordinator,
            outcomes,
            handler,
        }
    }

    /// Post `data` as the backend's popup page would
    pub fn post_from_backend(&self, data: Value) -> usize {
        self.host.post_message(TEST_ORIGIN, data)
    }

    /// Let spawned session tasks run until they are idle
    ///
    /// Works with both paused and real clocks; never advances time.
    pub async fn settle(&self) {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    /// Advance a paused clock by `duration`, then settle
    pub async fn advance(&self, duration: Duration) {
        tokio::time::advance(duration).await;
        self.settle().await;
    }
}
