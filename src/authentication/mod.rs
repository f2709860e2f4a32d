//! Wiring and collaborator traits
//!
//! The factory assembles a coordinator plus outcome handler from settings;
//! the traits describe what the embedding application must provide.

pub mod factory;
pub mod traits;

pub use factory::{FeedbackSinks, PopupAuth, PopupAuthFactory};
pub use traits::{
    LogNotifier, LoginDispatcher, Navigator, Notification, NotificationLevel, Notifier,
};
