//! Turns authorization outcomes into user feedback
//!
//! Every definite outcome produces exactly one notice. A cancelled attempt
//! produces none: the user closed the popup on purpose.

use crate::authentication::traits::{LoginDispatcher, Navigator, Notification, Notifier};
use crate::models::{AuthErrorKind, AuthOutcome, LoginRequest, UserProfile};
use crate::oauth::providers::ProviderRegistry;
use crate::popup::coordinator::AuthOutcomes;
use crate::settings::{PopupAuthSettings, SessionSettings};
use std::sync::Arc;

/// Where users land after signing in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub default_redirect: String,
    pub admin_redirect: String,
}

impl RedirectPolicy {
    #[must_use]
    pub fn from_settings(session: &SessionSettings) -> Self {
        Self {
            default_redirect: session.default_redirect.clone(),
            admin_redirect: session.admin_redirect.clone(),
        }
    }

    #[must_use]
    pub fn target_for(&self, user: &UserProfile) -> &str {
        if user.is_admin() {
            &self.admin_redirect
        } else {
            &self.default_redirect
        }
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::from_settings(&SessionSettings::default())
    }
}

/// Consumes [`AuthOutcome`]s and drives the login, notice and navigation sinks
pub struct OutcomeHandler {
    login: Arc<dyn LoginDispatcher>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    registry: ProviderRegistry,
    redirects: RedirectPolicy,
    remember_me: bool,
}

impl OutcomeHandler {
    #[must_use]
    pub fn new(
        login: Arc<dyn LoginDispatcher>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            login,
            notifier,
            navigator,
            registry,
            redirects: RedirectPolicy::default(),
            remember_me: true,
        }
    }

    /// Take redirect targets and the remember-me flag from settings
    #[must_use]
    pub fn with_settings(mut self, settings: &PopupAuthSettings) -> Self {
        self.redirects = RedirectPolicy::from_settings(&settings.session);
        self.remember_me = settings.session.remember_me;
        self
    }

    #[must_use]
    pub fn with_remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    #[must_use]
    pub fn with_redirects(mut self, redirects: RedirectPolicy) -> Self {
        self.redirects = redirects;
        self
    }

    /// React to one outcome
    pub async fn handle(&self, outcome: &AuthOutcome) {
        match outcome {
            AuthOutcome::Success {
                token,
                user,
                provider,
            } => self.handle_success(token, user, provider).await,
            AuthOutcome::Error {
                message,
                kind,
                provider,
            } => self.notifier.notify(self.error_notice(*kind, message, provider)),
            AuthOutcome::Cancelled { provider, reason } => {
                log::debug!("Sign-in with {provider} cancelled ({reason:?}); no notice");
            }
        }
    }

    /// Handle outcomes until the coordinator is dropped
    pub async fn process(&self, outcomes: &mut AuthOutcomes) {
        while let Some(outcome) = outcomes.next().await {
            self.handle(&outcome).await;
        }
        log::debug!("Outcome channel closed");
    }

    async fn handle_success(&self, token: &str, user: &UserProfile, provider: &str) {
        let request = LoginRequest {
            token: token.to_string(),
            user: user.clone(),
            remember_me: self.remember_me,
        };

        if let Err(e) = self.login.dispatch_login(request).await {
            log::error!("❌ Storing {provider} session failed: {e}");
            self.notifier.notify(Notification::error(
                "Signed in, but your session could not be saved. Please try again.",
            ));
            return;
        }

        self.notifier.notify(Notification::success(format!(
            "Successfully signed in with {}!",
            self.registry.display_name(provider)
        )));

        let target = self.redirects.target_for(user);
        log::debug!("Routing {} to {target}", user.display_label());
        self.navigator.navigate(target, true);
    }

    fn error_notice(&self, kind: AuthErrorKind, message: &str, provider: &str) -> Notification {
        let name = self.registry.display_name(provider);
        match kind {
            AuthErrorKind::AccessDenied => {
                Notification::info(format!("Sign-in with {name} was cancelled."))
            }
            AuthErrorKind::RateLimited => Notification::warning(format!(
                "{message}. Please wait a moment before trying again."
            )),
            AuthErrorKind::Timeout => Notification::error(format!(
                "Sign-in with {name} timed out. Please try again."
            )),
            AuthErrorKind::Unknown => {
                Notification::error(format!("Sign-in with {name} failed: {message}"))
            }
        }
    }
}
