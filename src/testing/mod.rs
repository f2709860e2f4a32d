//! Testing utilities for popup-auth
//!
//! Available to unit tests and, behind the `testing` feature, to the
//! integration tests under `tests/`.
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built settings, registries and coordinators
//! - [`builders`] - Fluent builders for popup message payloads
//! - [`assertions`] - Assertion helpers for cleanup and feedback
//! - [`mock`] - In-memory host, window and recording sinks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use popup_auth::testing::{builders::PopupMessageBuilder, fixtures::TestFixtures};
//!
//! async fn sign_in() {
//!     let harness = TestFixtures::harness();
//!     assert!(harness.coordinator.start_authorization("google"));
//!     harness.post_from_backend(PopupMessageBuilder::success().build());
//! }
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mock;

pub use assertions::*;
pub use builders::PopupMessageBuilder;
pub use fixtures::{TestFixtures, TestHarness};
pub use mock::{
    MockPopupHost, MockWindow, RecordingLoginDispatcher, RecordingNavigator, RecordingNotifier,
};

/// Common test constants
pub mod constants {
    /// API base URL used by test settings
    pub const TEST_API_URL: &str = "http://localhost:5000/api";

    /// Origin popup pages are served from in tests
    pub const TEST_ORIGIN: &str = "http://localhost:5000";

    /// An origin that must never be trusted
    pub const FOREIGN_ORIGIN: &str = "https://evil.example.com";

    pub const TEST_TOKEN: &str = "test_session_token";

    pub const TEST_USER_ID: &str = "user_123";

    pub const TEST_USER_NAME: &str = "Test User";

    pub const TEST_EMAIL: &str = "test@example.com";

    /// Providers registered by the test fixtures
    pub const TEST_PROVIDERS: &[&str] = &["github", "google"];
}
