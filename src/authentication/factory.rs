//! Factory wiring a coordinator and its outcome handler from settings
//!
//! Embedding applications supply the platform host and the three feedback
//! sinks; everything else comes from [`PopupAuthSettings`].

use crate::authentication::traits::{LoginDispatcher, Navigator, Notifier};
use crate::errors::PopupAuthError;
use crate::handlers::outcome::OutcomeHandler;
use crate::oauth::providers::ProviderRegistry;
use crate::popup::coordinator::{AuthOutcomes, CoordinatorConfig, PopupCoordinator};
use crate::popup::host::PopupHost;
use crate::settings::PopupAuthSettings;
use crate::utils::logging::LoggingHelper;
use std::sync::Arc;

/// Application-side collaborators that consume outcomes
#[derive(Clone)]
pub struct FeedbackSinks {
    pub login: Arc<dyn LoginDispatcher>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

impl FeedbackSinks {
    pub fn new(
        login: Arc<dyn LoginDispatcher>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            login,
            notifier,
            navigator,
        }
    }
}

/// Everything `create` hands back
pub type PopupAuth = (PopupCoordinator, AuthOutcomes, OutcomeHandler);

pub struct PopupAuthFactory;

impl PopupAuthFactory {
    /// Build the coordinator, its completion channel and a handler for it
    ///
    /// The coordinator and the handler share the provider registry and the
    /// notifier, so start failures and outcomes land in the same place.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail validation, the provider table
    /// is invalid, or the API base URL does not yield an origin
    pub fn create(
        settings: &PopupAuthSettings,
        host: Arc<dyn PopupHost>,
        sinks: FeedbackSinks,
    ) -> Result<PopupAuth, PopupAuthError> {
        log::info!("🏭 Wiring popup authentication...");

        settings.validate()?;
        let registry = ProviderRegistry::from_settings(settings)?;
        LoggingHelper::log_providers_summary(&registry.ids());

        let config = CoordinatorConfig::from_settings(settings)?;
        log::info!(
            "✅ Popups open under {} and accept messages from {}",
            config.base_auth_url,
            config.expected_origin
        );
        if !config.auto_retry {
            log::info!("⚠️  Automatic retry is disabled");
        }

        let handler = OutcomeHandler::new(
            sinks.login,
            Arc::clone(&sinks.notifier),
            sinks.navigator,
            registry.clone(),
        )
        .with_settings(settings);
        let (coordinator, outcomes) =
            PopupCoordinator::new(host, registry, config, sinks.notifier);

        log::info!("🏭 Popup authentication ready");
        Ok((coordinator, outcomes, handler))
    }
}
