use crate::models::{AuthOutcome, CancelReason};
use crate::oauth::messages::{message_type, PopupMessage, WindowMessage};
use crate::popup::coordinator::{SessionId, Shared};
use crate::popup::host::ChildWindow;
use crate::utils::logging::LoggingHelper;
use crate::validation::origin_matches;
use log::{debug, warn};
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

/// How a session ended
#[derive(Debug)]
pub(crate) enum SessionExit {
    Outcome(AuthOutcome),
    /// The popup asked to start over with this provider
    Retry(String),
}

/// The hard deadline and the closed-window poll of one session
pub(crate) struct SessionTimers {
    deadline: Pin<Box<Sleep>>,
    liveness: Interval,
}

/// Longest span a session timer is armed for; longer settings are clamped
pub(crate) const MAX_TIMER_SPAN: Duration = Duration::from_secs(86_400 * 365 * 30);

impl SessionTimers {
    /// Must be called from within a Tokio runtime
    ///
    /// Durations are clamped to `1ms..=MAX_TIMER_SPAN` so arming never
    /// overflows the clock or builds a zero-period interval.
    pub(crate) fn arm(timeout: Duration, liveness_period: Duration) -> Self {
        let timeout = timeout.min(MAX_TIMER_SPAN);
        let liveness_period = liveness_period.clamp(Duration::from_millis(1), MAX_TIMER_SPAN);

        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now);
        // First poll one full period after opening, not immediately
        let first_poll = now.checked_add(liveness_period).unwrap_or(now);
        let mut liveness = tokio::time::interval_at(first_poll, liveness_period);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            deadline: Box::pin(tokio::time::sleep_until(deadline)),
            liveness,
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.deadline() <= Instant::now()
    }
}

/// Everything the session exclusively owns while the popup is up
struct SessionResources {
    window: Box<dyn ChildWindow>,
    messages: mpsc::UnboundedReceiver<WindowMessage>,
    timers: SessionTimers,
}

enum SessionEvent {
    Cancelled,
    Message(Option<WindowMessage>),
    TimedOut,
    LivenessTick,
}

/// One armed popup, driven to completion by [`PopupSession::run`]
pub(crate) struct PopupSession {
    id: SessionId,
    provider: String,
    resources: Option<SessionResources>,
    cancel: oneshot::Receiver<()>,
    shared: Arc<Shared>,
    finished: bool,
}

impl PopupSession {
    pub(crate) fn new(
        id: SessionId,
        provider: &str,
        window: Box<dyn ChildWindow>,
        messages: mpsc::UnboundedReceiver<WindowMessage>,
        timers: SessionTimers,
        cancel: oneshot::Receiver<()>,
        shared: Arc<Shared>,
    ) -> Self {
        shared.live_sessions.fetch_add(1, Ordering::SeqCst);
        Self {
            id,
            provider: provider.to_string(),
            resources: Some(SessionResources {
                window,
                messages,
                timers,
            }),
            cancel,
            shared,
            finished: false,
        }
    }

    pub(crate) async fn run(mut self) {
        let exit = self.wait_for_exit().await;
        self.cleanup();
        self.finished = true;
        let shared = Arc::clone(&self.shared);
        shared.finish_session(self.id, &self.provider, exit);
    }

    async fn wait_for_exit(&mut self) -> SessionExit {
        loop {
            let Some(resources) = self.resources.as_mut() else {
                return SessionExit::Outcome(self.cancelled(CancelReason::Caller));
            };

            let event = tokio::select! {
                biased;
                _ = &mut self.cancel => SessionEvent::Cancelled,
                message = resources.messages.recv() => SessionEvent::Message(message),
                () = &mut resources.timers.deadline => SessionEvent::TimedOut,
                _ = resources.timers.liveness.tick() => SessionEvent::LivenessTick,
            };

            match event {
                SessionEvent::Cancelled => {
                    debug!("Session {} cancelled by caller", self.id);
                    return SessionExit::Outcome(self.cancelled(CancelReason::Caller));
                }
                SessionEvent::Message(None) => {
                    warn!("Message listener for session {} closed by host", self.id);
                    return SessionExit::Outcome(self.cancelled(CancelReason::ListenerLost));
                }
                SessionEvent::Message(Some(message)) => {
                    if let Some(exit) = self.handle_message(&message) {
                        return exit;
                    }
                    // A steady stream of ignored messages must not hold off the deadline
                    if self
                        .resources
                        .as_ref()
                        .is_some_and(|r| r.timers.deadline_passed())
                    {
                        return self.timed_out();
                    }
                }
                SessionEvent::TimedOut => return self.timed_out(),
                SessionEvent::LivenessTick => {
                    if resources.window.is_closed() {
                        debug!("{} popup closed by the user", self.provider);
                        return SessionExit::Outcome(self.cancelled(CancelReason::WindowClosed));
                    }
                }
            }
        }
    }

    /// Terminal exit for a recognized message from the backend origin,
    /// `None` for anything that should be ignored
    fn handle_message(&self, message: &WindowMessage) -> Option<SessionExit> {
        if !origin_matches(&self.shared.config.expected_origin, &message.origin) {
            LoggingHelper::log_message_wrong_origin(&message.origin);
            return None;
        }

        let parsed = match PopupMessage::parse(&message.data) {
            Ok(parsed) => parsed,
            Err(e) => {
                LoggingHelper::log_message_unrecognized(message_type(&message.data), &e);
                return None;
            }
        };
        debug!("Session {} received {}", self.id, parsed.type_name());

        let exit = match parsed {
            PopupMessage::Success {
                token,
                user,
                provider,
            } => SessionExit::Outcome(AuthOutcome::Success {
                token,
                user,
                provider: provider.unwrap_or_else(|| self.provider.clone()),
            }),
            PopupMessage::Error {
                message,
                kind,
                provider,
            } => SessionExit::Outcome(AuthOutcome::Error {
                message,
                kind,
                provider: provider.unwrap_or_else(|| self.provider.clone()),
            }),
            PopupMessage::Retry { provider } => {
                SessionExit::Retry(provider.unwrap_or_else(|| self.provider.clone()))
            }
        };
        Some(exit)
    }

    fn timed_out(&self) -> SessionExit {
        warn!(
            "⏰ {} popup timed out after {:?}, force-closing",
            self.provider, self.shared.config.timeout
        );
        SessionExit::Outcome(AuthOutcome::timeout(&self.provider))
    }

    fn cancelled(&self, reason: CancelReason) -> AuthOutcome {
        AuthOutcome::Cancelled {
            provider: self.provider.clone(),
            reason,
        }
    }

    /// Close the window, drop the listener and both timers
    ///
    /// Idempotent; also runs when the task is dropped before finishing.
    fn cleanup(&mut self) {
        let Some(resources) = self.resources.take() else {
            return;
        };
        let SessionResources {
            window,
            mut messages,
            timers,
        } = resources;

        if !window.is_closed() {
            window.close();
        }
        messages.close();
        drop(messages);
        drop(timers);

        self.shared.live_sessions.fetch_sub(1, Ordering::SeqCst);
        LoggingHelper::log_session_released(&self.provider, &self.id);
    }
}

impl Drop for PopupSession {
    fn drop(&mut self) {
        self.cleanup();
        if !self.finished {
            self.shared.release_session(self.id);
        }
    }
}
