//! OAuth provider registry and the popup message contract
//!
//! The registry decides which providers a popup may be opened for; the
//! message types describe what the popup sends back to its opener.

pub mod messages;
pub mod providers;

pub use messages::{message_type, PopupMessage, WindowMessage};
pub use providers::{ProviderDescriptor, ProviderRegistry};
