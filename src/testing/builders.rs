//! Fluent builders for popup message payloads
//!
//! Produces the raw JSON a popup page would post to its opener, so tests
//! exercise the same parsing path as real traffic.

use crate::oauth::messages::{AUTH_ERROR, AUTH_RETRY, AUTH_SUCCESS};
use serde_json::{json, Map, Value};

use super::constants::{TEST_EMAIL, TEST_TOKEN, TEST_USER_ID, TEST_USER_NAME};

/// Builder for popup message payloads
pub struct PopupMessageBuilder {
    fields: Map<String, Value>,
}

impl PopupMessageBuilder {
    fn of_type(message_type: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), Value::String(message_type.to_string()));
        Self { fields }
    }

    /// `AUTH_SUCCESS` with a test token and a regular user
    #[must_use]
    pub fn success() -> Self {
        Self::of_type(AUTH_SUCCESS)
            .with_token(TEST_TOKEN)
            .with_user(json!({
                "id": TEST_USER_ID,
                "name": TEST_USER_NAME,
                "email": TEST_EMAIL,
                "role": "student",
            }))
    }

    /// `AUTH_ERROR` with the given `errorType`
    #[must_use]
    pub fn error(error_type: &str) -> Self {
        Self::of_type(AUTH_ERROR)
            .with_field("error", json!("Authentication failed"))
            .with_field("errorType", json!(error_type))
    }

    #[must_use]
    pub fn retry() -> Self {
        Self::of_type(AUTH_RETRY)
    }

    fn data_mut(&mut self) -> &mut Map<String, Value> {
        let data = self
            .fields
            .entry("data")
            .or_insert_with(|| Value::Object(Map::new()));
        if !data.is_object() {
            *data = Value::Object(Map::new());
        }
        match data {
            Value::Object(map) => map,
            _ => unreachable!("data was just made an object"),
        }
    }

    /// Set `data.token`
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.data_mut().insert("token".to_string(), json!(token));
        self
    }

    /// Set `data.user`
    #[must_use]
    pub fn with_user(mut self, user: Value) -> Self {
        self.data_mut().insert("user".to_string(), user);
        self
    }

    /// Replace the user's role, keeping the other fields
    #[must_use]
    pub fn with_role(mut self, role: &str) -> Self {
        if let Some(Value::Object(user)) = self.data_mut().get_mut("user") {
            user.insert("role".to_string(), json!(role));
        }
        self
    }

    #[must_use]
    pub fn with_provider(self, provider: &str) -> Self {
        self.with_field("provider", json!(provider))
    }

    #[must_use]
    pub fn with_error_message(self, message: &str) -> Self {
        self.with_field("error", json!(message))
    }

    #[must_use]
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn without_field(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    #[must_use]
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}
