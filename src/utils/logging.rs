// Centralized logging for popup lifecycle events
use crate::errors::{PopupAuthError, StartError};
use crate::models::AuthOutcome;
use crate::popup::geometry::PopupGeometry;
use log::{debug, info, warn};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log a popup that was opened and is now watched
    pub fn log_session_armed(provider: &str, session_id: &Uuid, url: &Url, geometry: &PopupGeometry) {
        info!("🔐 Opened {provider} authorization popup (session {session_id})");
        debug!("Popup target {url} with features {}", geometry.features());
    }

    /// Log the release of a session's window, listener and timers
    pub fn log_session_released(provider: &str, session_id: &Uuid) {
        debug!("🧹 Released {provider} popup resources (session {session_id})");
    }

    /// Log a refused start
    pub fn log_start_rejected(provider: &str, error: &StartError) {
        match error {
            StartError::SessionActive => {
                debug!("Ignoring sign-in with {provider}: {error}");
            }
            StartError::NoRuntime => {
                log::error!("❌ Cannot start sign-in with {provider}: {error}");
            }
            _ => warn!("❌ Cannot start sign-in with {provider}: {error}"),
        }
    }

    /// Log a message dropped by the origin check
    pub fn log_message_wrong_origin(origin: &str) {
        debug!("Ignoring window message from unexpected origin '{origin}'");
    }

    /// Log a message from the backend origin that is not part of the handshake
    pub fn log_message_unrecognized(message_type: Option<&str>, error: &PopupAuthError) {
        warn!(
            "⚠️  Ignoring unrecognized popup message (type: {}): {error}",
            message_type.unwrap_or("<none>")
        );
    }

    /// Log a scheduled re-open after `AUTH_RETRY`
    pub fn log_retry_scheduled(provider: &str, delay: Duration) {
        info!("🔄 Re-opening {provider} popup in {}ms", delay.as_millis());
    }

    /// Log the terminal outcome of an attempt (never the token)
    pub fn log_outcome(outcome: &AuthOutcome) {
        match outcome {
            AuthOutcome::Success { .. } => info!("✅ Sign-in {}", outcome.summary()),
            AuthOutcome::Error { .. } => warn!("❌ Sign-in {}", outcome.summary()),
            AuthOutcome::Cancelled { .. } => info!("⏭️  Sign-in {}", outcome.summary()),
        }
    }

    /// Log summary of configured providers
    pub fn log_providers_summary(provider_ids: &[&str]) {
        info!("🎯 Configured sign-in providers: {provider_ids:?}");
    }
}
