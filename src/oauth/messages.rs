//! Cross-window message contract between the popup and its opener
//!
//! ```text
//! { type: "AUTH_SUCCESS", data: { token, user }, provider }
//! { type: "AUTH_ERROR",   error, errorType, provider }
//! { type: "AUTH_RETRY",   provider }
//! ```

use crate::errors::PopupAuthError;
use crate::models::{AuthErrorKind, UserProfile};
use serde::Deserialize;
use serde_json::Value;

pub const AUTH_SUCCESS: &str = "AUTH_SUCCESS";
pub const AUTH_ERROR: &str = "AUTH_ERROR";
pub const AUTH_RETRY: &str = "AUTH_RETRY";

const GENERIC_ERROR_MESSAGE: &str = "Authentication failed";

/// A message as delivered by the host: sender origin plus raw payload
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    pub origin: String,
    pub data: Value,
}

impl WindowMessage {
    #[must_use]
    pub fn new(origin: &str, data: Value) -> Self {
        Self {
            origin: origin.to_string(),
            data,
        }
    }
}

/// A recognized popup message
///
/// `provider` is `None` when the popup did not name one; the session's
/// provider applies then.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupMessage {
    Success {
        token: String,
        user: UserProfile,
        provider: Option<String>,
    },
    Error {
        message: String,
        kind: AuthErrorKind,
        provider: Option<String>,
    },
    Retry {
        provider: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum WireMessage {
    #[serde(rename = "AUTH_SUCCESS")]
    Success {
        data: SuccessData,
        #[serde(default)]
        provider: Option<String>,
    },
    #[serde(rename = "AUTH_ERROR")]
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default, rename = "errorType")]
        error_type: Option<String>,
        #[serde(default)]
        provider: Option<String>,
    },
    #[serde(rename = "AUTH_RETRY")]
    Retry {
        #[serde(default)]
        provider: Option<String>,
    },
}

#[derive(Deserialize)]
struct SuccessData {
    token: String,
    // Absent and `null` both mean "no profile"
    #[serde(default)]
    user: Option<UserProfile>,
}

impl PopupMessage {
    /// Decode a raw message payload
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the payload is not an object with a
    /// recognized `type`, a required field is missing, or a success
    /// carries an empty token.
    pub fn parse(value: &Value) -> Result<Self, PopupAuthError> {
        let wire = WireMessage::deserialize(value).map_err(|e| {
            PopupAuthError::Protocol(format!(
                "{} message: {e}",
                message_type(value).unwrap_or("untyped")
            ))
        })?;

        match wire {
            WireMessage::Success { data, provider } => {
                if data.token.trim().is_empty() {
                    return Err(PopupAuthError::Protocol(
                        "AUTH_SUCCESS message carries an empty token".to_string(),
                    ));
                }
                Ok(PopupMessage::Success {
                    token: data.token,
                    user: data.user.unwrap_or_default(),
                    provider: non_empty(provider),
                })
            }
            WireMessage::Error {
                error,
                error_type,
                provider,
            } => Ok(PopupMessage::Error {
                message: non_empty(error).unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
                kind: error_type
                    .as_deref()
                    .map_or(AuthErrorKind::Unknown, AuthErrorKind::from_wire),
                provider: non_empty(provider),
            }),
            WireMessage::Retry { provider } => Ok(PopupMessage::Retry {
                provider: non_empty(provider),
            }),
        }
    }

    /// Wire name of this message
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            PopupMessage::Success { .. } => AUTH_SUCCESS,
            PopupMessage::Error { .. } => AUTH_ERROR,
            PopupMessage::Retry { .. } => AUTH_RETRY,
        }
    }
}

/// The raw `type` field of a payload, if it has one
#[must_use]
pub fn message_type(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
