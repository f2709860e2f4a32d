//! Mock objects and fake implementations for testing
//!
//! In-memory stand-ins for the platform host and the application sinks.
//! Every mock is cheap to clone and records what the code under test did.

use crate::authentication::traits::{LoginDispatcher, Navigator, Notification, Notifier};
use crate::errors::PopupAuthError;
use crate::models::LoginRequest;
use crate::oauth::messages::WindowMessage;
use crate::popup::geometry::{PopupGeometry, Viewport};
use crate::popup::host::{ChildWindow, PopupHost};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Child window whose open/closed state tests can flip
#[derive(Clone, Default)]
pub struct MockWindow {
    closed: Arc<AtomicBool>,
    close_calls: Arc<AtomicUsize>,
}

impl MockWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is already closed when returned (some blockers do this)
    #[must_use]
    pub fn closed() -> Self {
        let window = Self::default();
        window.closed.store(true, Ordering::SeqCst);
        window
    }

    /// The user closes the popup without finishing
    pub fn simulate_user_close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// How many times the coordinator called `close()`
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl ChildWindow for MockWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// One `open_child_window` call as seen by the host
#[derive(Clone)]
pub struct OpenedWindow {
    pub url: Url,
    pub name: String,
    pub geometry: PopupGeometry,
    pub window: MockWindow,
}

#[derive(Default)]
struct HostState {
    block_popups: bool,
    return_closed_handles: bool,
    opened: Vec<OpenedWindow>,
    listeners: Vec<mpsc::UnboundedSender<WindowMessage>>,
}

/// In-memory [`PopupHost`]
///
/// Records every opened window and fans posted messages out to every
/// registered listener, like a browser `message` event would.
#[derive(Clone)]
pub struct MockPopupHost {
    viewport: Viewport,
    state: Arc<Mutex<HostState>>,
}

impl MockPopupHost {
    #[must_use]
    pub fn new() -> Self {
        Self::with_viewport(Viewport::new(0, 0, 1280, 800))
    }

    #[must_use]
    pub fn with_viewport(viewport: Viewport) -> Self {
        Self {
            viewport,
            state: Arc::new(Mutex::new(HostState::default())),
        }
    }

    /// Refuse every following `open_child_window`
    pub fn block_popups(&self, blocked: bool) {
        lock(&self.state).block_popups = blocked;
    }

    /// Return handles that report closed immediately
    pub fn return_closed_handles(&self, closed: bool) {
        lock(&self.state).return_closed_handles = closed;
    }

    /// Post a message to the opener from `origin`
    ///
    /// Returns how many live listeners received it.
    pub fn post_message(&self, origin: &str, data: Value) -> usize {
        let mut state = lock(&self.state);
        state.listeners.retain(|tx| !tx.is_closed());
        state
            .listeners
            .iter()
            .filter(|tx| tx.send(WindowMessage::new(origin, data.clone())).is_ok())
            .count()
    }

    /// Listeners whose receiver is still alive
    #[must_use]
    pub fn active_listeners(&self) -> usize {
        lock(&self.state)
            .listeners
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Number of windows opened so far
    #[must_use]
    pub fn open_count(&self) -> usize {
        lock(&self.state).opened.len()
    }

    #[must_use]
    pub fn opened(&self) -> Vec<OpenedWindow> {
        lock(&self.state).opened.clone()
    }

    #[must_use]
    pub fn last_window(&self) -> Option<OpenedWindow> {
        lock(&self.state).opened.last().cloned()
    }

    /// Windows the host opened that are still open
    #[must_use]
    pub fn open_windows(&self) -> usize {
        lock(&self.state)
            .opened
            .iter()
            .filter(|w| w.window.is_open())
            .count()
    }
}

impl Default for MockPopupHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupHost for MockPopupHost {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn open_child_window(
        &self,
        url: &Url,
        name: &str,
        geometry: &PopupGeometry,
    ) -> Option<Box<dyn ChildWindow>> {
        let mut state = lock(&self.state);
        if state.block_popups {
            return None;
        }
        let window = if state.return_closed_handles {
            MockWindow::closed()
        } else {
            MockWindow::new()
        };
        state.opened.push(OpenedWindow {
            url: url.clone(),
            name: name.to_string(),
            geometry: *geometry,
            window: window.clone(),
        });
        Some(Box::new(window))
    }

    fn listen(&self) -> mpsc::UnboundedReceiver<WindowMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.state).listeners.push(tx);
        rx
    }
}

/// Notifier that keeps every notice
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn clear(&self) {
        lock(&self.notifications).clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}

/// Navigator that keeps every `(path, replace)` pair
#[derive(Clone, Default)]
pub struct RecordingNavigator {
    navigations: Arc<Mutex<Vec<(String, bool)>>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn navigations(&self) -> Vec<(String, bool)> {
        lock(&self.navigations).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str, replace: bool) {
        lock(&self.navigations).push((path.to_string(), replace));
    }
}

/// Login dispatcher that records requests and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingLoginDispatcher {
    requests: Arc<Mutex<Vec<LoginRequest>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingLoginDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing() -> Self {
        let dispatcher = Self::default();
        dispatcher.fail.store(true, Ordering::SeqCst);
        dispatcher
    }

    #[must_use]
    pub fn requests(&self) -> Vec<LoginRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl LoginDispatcher for RecordingLoginDispatcher {
    async fn dispatch_login(&self, request: LoginRequest) -> Result<(), PopupAuthError> {
        lock(&self.requests).push(request);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PopupAuthError::LoginDispatch(
                "session store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}
