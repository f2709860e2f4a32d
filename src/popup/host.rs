//! Platform capability the coordinator drives
//!
//! A browser build implements these over `window.open` and the `message`
//! event; a desktop shell over its webview API; tests over in-memory mocks.

use crate::oauth::messages::WindowMessage;
use crate::popup::geometry::{PopupGeometry, Viewport};
use tokio::sync::mpsc;
use url::Url;

/// Opens child windows and delivers cross-window messages
pub trait PopupHost: Send + Sync {
    /// Geometry of the opener, used to center the popup
    fn viewport(&self) -> Viewport;

    /// Open a child window navigated to `url`
    ///
    /// Returns `None` when the platform refused to open it (popup blocker).
    /// A handle that reports `is_closed()` right away is treated the same.
    fn open_child_window(
        &self,
        url: &Url,
        name: &str,
        geometry: &PopupGeometry,
    ) -> Option<Box<dyn ChildWindow>>;

    /// Register a message listener
    ///
    /// Every message posted to the opener is delivered to every live
    /// receiver. Dropping or closing the receiver removes the listener.
    fn listen(&self) -> mpsc::UnboundedReceiver<WindowMessage>;
}

/// Handle to an opened child window
pub trait ChildWindow: Send + Sync {
    fn is_closed(&self) -> bool;

    /// Close the window; closing an already-closed window is a no-op
    fn close(&self);
}
