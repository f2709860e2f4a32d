#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the popup-auth library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod authentication;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod popup;
pub mod settings;
pub mod utils;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use authentication::{
    FeedbackSinks, LoginDispatcher, Navigator, Notification, NotificationLevel, Notifier,
    PopupAuthFactory,
};
pub use errors::{PopupAuthError, StartError};
pub use handlers::OutcomeHandler;
pub use models::{AuthErrorKind, AuthOutcome, CancelReason, LoginRequest, UserProfile};
pub use oauth::{PopupMessage, ProviderDescriptor, ProviderRegistry, WindowMessage};
pub use popup::{
    AuthOutcomes, ChildWindow, CoordinatorConfig, CoordinatorState, PopupCoordinator, PopupHost,
    Viewport,
};
pub use settings::PopupAuthSettings;
