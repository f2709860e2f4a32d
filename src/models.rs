use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Profile of the signed-in user as reported by the backend
///
/// Every field is optional on the wire; unknown fields are preserved in
/// `extra` so they reach the login sink untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserProfile {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Whether the user should land on the admin area after sign-in
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// Best label for log lines: email, then name, then id
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.email
            .as_deref()
            .or(self.name.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("<anonymous>")
    }
}

// Backends disagree on whether ids are strings or numbers
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "user id must be a string or number, got {other}"
        ))),
    }
}

/// Classification of a failed authorization attempt
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    /// The user declined at the provider
    AccessDenied,
    /// Too many attempts
    RateLimited,
    /// No handshake completed before the coordinator's deadline
    Timeout,
    Unknown,
}

impl AuthErrorKind {
    /// Map the `errorType` field of an `AUTH_ERROR` message
    ///
    /// `Timeout` is only ever produced by the coordinator itself.
    #[must_use]
    pub fn from_wire(error_type: &str) -> Self {
        match error_type {
            "access_denied" => AuthErrorKind::AccessDenied,
            "rate_limit_exceeded" => AuthErrorKind::RateLimited,
            _ => AuthErrorKind::Unknown,
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthErrorKind::AccessDenied => "access_denied",
            AuthErrorKind::RateLimited => "rate_limited",
            AuthErrorKind::Timeout => "timeout",
            AuthErrorKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Why an attempt ended without a definite success or error
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The user closed the popup
    WindowClosed,
    /// The caller invoked `cancel` or dropped the coordinator
    Caller,
    /// The popup asked for a retry but automatic retry is disabled
    RetryDeclined,
    /// The host stopped delivering messages
    ListenerLost,
}

/// Result of one authorization attempt
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthOutcome {
    Success {
        token: String,
        user: UserProfile,
        provider: String,
    },
    Error {
        message: String,
        #[serde(rename = "error_kind")]
        kind: AuthErrorKind,
        provider: String,
    },
    Cancelled {
        provider: String,
        reason: CancelReason,
    },
}

impl AuthOutcome {
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            AuthOutcome::Success { provider, .. }
            | AuthOutcome::Error { provider, .. }
            | AuthOutcome::Cancelled { provider, .. } => provider,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success { .. })
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<AuthErrorKind> {
        match self {
            AuthOutcome::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn timeout(provider: &str) -> Self {
        AuthOutcome::Error {
            message: "Authentication timed out".to_string(),
            kind: AuthErrorKind::Timeout,
            provider: provider.to_string(),
        }
    }
}

/// Payload handed to the login-dispatch collaborator after a success
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub token: String,
    pub user: UserProfile,
    pub remember_me: bool,
}

impl AuthOutcome {
    /// Log-safe description; never includes the token
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            AuthOutcome::Success { user, provider, .. } => {
                format!("success via {provider} for {}", user.display_label())
            }
            AuthOutcome::Error {
                kind, provider, ..
            } => format!("error ({kind}) via {provider}"),
            AuthOutcome::Cancelled { provider, reason } => {
                format!("cancelled ({reason:?}) via {provider}")
            }
        }
    }
}
