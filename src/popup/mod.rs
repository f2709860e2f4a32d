//! Popup window coordination
//!
//! - [`host`] - platform capability: open windows, receive messages
//! - [`geometry`] - popup placement
//! - [`coordinator`] - the single-flight authorization state machine
//!
//! Each armed popup is owned by one session task. The session alone holds
//! the window handle, the message listener and the two timers, and releases
//! all of them on every exit path.

pub mod coordinator;
pub mod geometry;
pub mod host;
mod session;

pub use coordinator::{
    AuthOutcomes, CoordinatorConfig, CoordinatorState, PopupCoordinator, SessionId,
};
pub use geometry::{PopupGeometry, Viewport};
pub use host::{ChildWindow, PopupHost};
