//! Validation Module
//!
//! Checks applied to data crossing the window boundary. The origin check is
//! the security control of the popup handshake: a message whose origin is
//! not the backend's is dropped before its payload is looked at.

pub mod origin;

pub use origin::{backend_origin, origin_matches};
