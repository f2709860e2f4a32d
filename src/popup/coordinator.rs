//! OAuth popup coordinator
//!
//! Drives one authorization attempt at a time: opens the provider popup,
//! waits for the popup's message handshake, and resolves the attempt to an
//! [`AuthOutcome`] on the coordinator's completion channel.
//!
//! ```text
//! Idle --start--> Active --AUTH_SUCCESS / AUTH_ERROR / timeout / closed--> Idle
//!                   |
//!                   +--AUTH_RETRY--> Idle --retry delay--> Active
//! ```

use crate::authentication::traits::{Notification, Notifier};
use crate::errors::{PopupAuthError, StartError};
use crate::models::{AuthOutcome, CancelReason};
use crate::oauth::providers::ProviderRegistry;
use crate::popup::geometry::PopupGeometry;
use crate::popup::host::PopupHost;
use crate::popup::session::{PopupSession, SessionExit, SessionTimers};
use crate::settings::PopupAuthSettings;
use crate::utils::logging::LoggingHelper;
use crate::validation::backend_origin;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub type SessionId = Uuid;

/// Runtime parameters of the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Authorization popups open at `{base_auth_url}/auth/{provider}`
    pub base_auth_url: String,
    /// Only messages from this origin are considered
    pub expected_origin: String,
    pub popup_width: u32,
    pub popup_height: u32,
    pub window_name: String,
    pub liveness_interval: Duration,
    pub timeout: Duration,
    pub retry_delay: Duration,
    pub auto_retry: bool,
}

impl CoordinatorConfig {
    /// Default timings for a backend at `base_auth_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not yield an origin
    pub fn new(base_auth_url: &str, api_suffix: &str) -> Result<Self, PopupAuthError> {
        let mut settings = PopupAuthSettings::default();
        settings.api.base_url = base_auth_url.to_string();
        settings.api.api_suffix = api_suffix.to_string();
        Self::from_settings(&settings)
    }

    /// # Errors
    ///
    /// Returns an error if `api.base_url` does not yield an origin
    pub fn from_settings(settings: &PopupAuthSettings) -> Result<Self, PopupAuthError> {
        Ok(Self {
            base_auth_url: settings.api.base_url.clone(),
            expected_origin: backend_origin(&settings.api.base_url, &settings.api.api_suffix)?,
            popup_width: settings.popup.width,
            popup_height: settings.popup.height,
            window_name: settings.popup.window_name.clone(),
            liveness_interval: settings.liveness_interval(),
            timeout: settings.timeout(),
            retry_delay: settings.retry_delay(),
            auto_retry: settings.popup.auto_retry,
        })
    }
}

/// Snapshot of what the coordinator is doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Active {
        session_id: SessionId,
        provider: String,
        started_at: DateTime<Utc>,
    },
    /// A popup asked for a retry and the delayed restart has not fired yet
    RetryPending { provider: String },
}

/// Completion channel: one [`AuthOutcome`] per finished attempt
#[derive(Debug)]
pub struct AuthOutcomes {
    rx: mpsc::UnboundedReceiver<AuthOutcome>,
}

impl AuthOutcomes {
    /// Wait for the next outcome; `None` once the coordinator is gone
    /// and every outcome has been taken
    pub async fn next(&mut self) -> Option<AuthOutcome> {
        self.rx.recv().await
    }

    /// Take an outcome if one is already queued
    pub fn try_next(&mut self) -> Option<AuthOutcome> {
        self.rx.try_recv().ok()
    }
}

struct ActiveSession {
    id: SessionId,
    provider: String,
    started_at: DateTime<Utc>,
    cancel: oneshot::Sender<()>,
}

struct PendingRetry {
    id: Uuid,
    provider: String,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct CoordinatorInner {
    active: Option<ActiveSession>,
    pending_retry: Option<PendingRetry>,
}

/// State shared between the coordinator handle and its session tasks
pub(crate) struct Shared {
    host: Arc<dyn PopupHost>,
    registry: ProviderRegistry,
    pub(crate) config: CoordinatorConfig,
    notifier: Arc<dyn Notifier>,
    outcomes: mpsc::UnboundedSender<AuthOutcome>,
    state: Mutex<CoordinatorInner>,
    pub(crate) live_sessions: AtomicUsize,
}

/// Single-flight OAuth popup coordinator
///
/// Must be used from within a Tokio runtime: each armed popup is watched by
/// a spawned task. Dropping the coordinator cancels any active popup and any
/// pending retry.
pub struct PopupCoordinator {
    shared: Arc<Shared>,
}

impl PopupCoordinator {
    /// Create a coordinator and its completion channel
    ///
    /// `notifier` receives the synchronous start failures (popup blocked,
    /// unknown provider); everything else arrives on the returned channel.
    #[must_use]
    pub fn new(
        host: Arc<dyn PopupHost>,
        registry: ProviderRegistry,
        config: CoordinatorConfig,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, AuthOutcomes) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            host,
            registry,
            config,
            notifier,
            outcomes: tx,
            state: Mutex::new(CoordinatorInner::default()),
            live_sessions: AtomicUsize::new(0),
        });
        (Self { shared }, AuthOutcomes { rx })
    }

    /// Open the authorization popup for `provider`
    ///
    /// Returns `false` without creating a session when the provider is
    /// unknown, a popup is already open, or the popup was blocked. Unknown
    /// providers and blocked popups also produce an error notice.
    pub fn start_authorization(&self, provider: &str) -> bool {
        self.shared.start_authorization(provider)
    }

    /// Same as [`start_authorization`](Self::start_authorization) but
    /// reports why a start was refused, without sending a notice
    ///
    /// # Errors
    ///
    /// Returns the [`StartError`] that kept the popup from opening
    pub fn try_start(&self, provider: &str) -> Result<SessionId, StartError> {
        self.shared.try_start(provider)
    }

    /// Abandon the active popup and any pending retry
    ///
    /// An active popup is closed and resolves to
    /// `Cancelled { reason: Caller }`. The coordinator is idle as soon as this
    /// returns, so a new attempt may start in the same tick. Returns whether
    /// there was anything to cancel.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        let inner = self.shared.lock();
        if let Some(active) = &inner.active {
            CoordinatorState::Active {
                session_id: active.id,
                provider: active.provider.clone(),
                started_at: active.started_at,
            }
        } else if let Some(retry) = &inner.pending_retry {
            CoordinatorState::RetryPending {
                provider: retry.provider.clone(),
            }
        } else {
            CoordinatorState::Idle
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.lock().active.is_some()
    }

    /// Sessions whose window, listener or timers are not released yet
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.shared.live_sessions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.shared.registry
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.shared.config
    }
}

impl Drop for PopupCoordinator {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CoordinatorInner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_authorization(self: &Arc<Self>, provider: &str) -> bool {
        match self.try_start(provider) {
            Ok(_) => true,
            Err(err) => {
                LoggingHelper::log_start_rejected(provider, &err);
                if let Some(notice) = err.user_notice() {
                    self.notifier.notify(Notification::error(notice));
                }
                false
            }
        }
    }

    fn try_start(self: &Arc<Self>, provider: &str) -> Result<SessionId, StartError> {
        if !self.registry.is_known(provider) {
            return Err(StartError::UnknownProvider(provider.to_string()));
        }
        let runtime = Handle::try_current().map_err(|_| StartError::NoRuntime)?;
        // Armed before the slot is claimed so nothing below can leave it held
        let timers = SessionTimers::arm(self.config.timeout, self.config.liveness_interval);

        // Held across the open so two callers cannot both pass the check
        let mut inner = self.lock();
        if inner.active.is_some() {
            return Err(StartError::SessionActive);
        }

        let url = self
            .registry
            .authorization_url(&self.config.base_auth_url, provider)
            .map_err(|e| StartError::InvalidUrl(e.to_string()))?;
        let geometry = PopupGeometry::centered(
            self.host.viewport(),
            self.config.popup_width,
            self.config.popup_height,
        );

        let window = self
            .host
            .open_child_window(&url, &self.config.window_name, &geometry)
            .ok_or(StartError::PopupBlocked)?;
        if window.is_closed() {
            return Err(StartError::PopupBlocked);
        }

        let messages = self.host.listen();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let id = Uuid::new_v4();
        let started_at = Utc::now();

        // An explicit start supersedes a retry that has not fired yet
        if let Some(retry) = inner.pending_retry.take() {
            retry.task.abort();
        }
        inner.active = Some(ActiveSession {
            id,
            provider: provider.to_string(),
            started_at,
            cancel: cancel_tx,
        });
        drop(inner);

        let session = PopupSession::new(
            id,
            provider,
            window,
            messages,
            timers,
            cancel_rx,
            Arc::clone(self),
        );
        LoggingHelper::log_session_armed(provider, &id, &url, &geometry);
        runtime.spawn(session.run());
        Ok(id)
    }

    /// Frees the active slot right away; the session task closes its
    /// window and emits `Cancelled { Caller }` when it next runs
    fn cancel(&self) -> bool {
        let mut inner = self.lock();
        let mut cancelled = false;

        if let Some(retry) = inner.pending_retry.take() {
            retry.task.abort();
            log::info!("🛑 Dropped pending retry for {}", retry.provider);
            cancelled = true;
        }
        if let Some(active) = inner.active.take() {
            log::info!("🛑 Cancelling {} popup (session {})", active.provider, active.id);
            // The session may be finishing on its own; either way it ends
            let _ = active.cancel.send(());
            cancelled = true;
        }
        cancelled
    }

    /// Called by a session after its resources are released
    pub(crate) fn finish_session(self: &Arc<Self>, id: SessionId, provider: &str, exit: SessionExit) {
        let still_owned = self.release_session(id);

        match exit {
            SessionExit::Outcome(outcome) => self.emit(outcome),
            // Cancelled while the retry request was in flight
            SessionExit::Retry(_) if !still_owned => self.emit(AuthOutcome::Cancelled {
                provider: provider.to_string(),
                reason: CancelReason::Caller,
            }),
            SessionExit::Retry(retry_provider) if self.config.auto_retry => {
                self.schedule_retry(retry_provider);
            }
            SessionExit::Retry(retry_provider) => {
                log::info!(
                    "Popup for {provider} asked to retry with {retry_provider}; automatic retry is off"
                );
                self.emit(AuthOutcome::Cancelled {
                    provider: retry_provider,
                    reason: CancelReason::RetryDeclined,
                });
            }
        }
    }

    /// Clear the active slot if it still belongs to `id`
    ///
    /// Returns `false` when the slot was already freed by `cancel`.
    pub(crate) fn release_session(&self, id: SessionId) -> bool {
        let mut inner = self.lock();
        if inner.active.as_ref().is_some_and(|a| a.id == id) {
            inner.active = None;
            true
        } else {
            false
        }
    }

    fn emit(&self, outcome: AuthOutcome) {
        LoggingHelper::log_outcome(&outcome);
        if self.outcomes.send(outcome).is_err() {
            log::debug!("Outcome receiver dropped; outcome discarded");
        }
    }

    fn schedule_retry(self: &Arc<Self>, provider: String) {
        let Ok(runtime) = Handle::try_current() else {
            log::error!("No runtime available to schedule retry for {provider}");
            return;
        };

        let retry_id = Uuid::new_v4();
        let delay = self.config.retry_delay;
        let weak = Arc::downgrade(self);
        let retry_provider = provider.clone();

        let mut inner = self.lock();
        if let Some(previous) = inner.pending_retry.take() {
            previous.task.abort();
        }
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let still_pending = {
                let mut inner = shared.lock();
                if inner.pending_retry.as_ref().is_some_and(|r| r.id == retry_id) {
                    inner.pending_retry = None;
                    true
                } else {
                    false
                }
            };
            if still_pending {
                shared.start_authorization(&retry_provider);
            }
        });
        LoggingHelper::log_retry_scheduled(&provider, delay);
        inner.pending_retry = Some(PendingRetry {
            id: retry_id,
            provider,
            task,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_default_settings() {
        let config = CoordinatorConfig::from_settings(&PopupAuthSettings::default()).unwrap();
        assert_eq!(config.base_auth_url, "http://localhost:5000/api");
        assert_eq!(config.expected_origin, "http://localhost:5000");
        assert_eq!(config.liveness_interval, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert!(config.auto_retry);
    }

    #[test]
    fn test_config_new_rejects_bad_base() {
        assert!(CoordinatorConfig::new("::::", "/api").is_err());
        let config = CoordinatorConfig::new("https://lms.example.com/api", "/api").unwrap();
        assert_eq!(config.expected_origin, "https://lms.example.com");
    }
}
