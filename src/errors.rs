//! Error types for popup authentication
//!
//! Only configuration and protocol problems surface as errors. Terminal
//! results of an authorization attempt (denied, rate limited, timed out)
//! are ordinary [`AuthOutcome`](crate::models::AuthOutcome) values.

use thiserror::Error;

/// Errors raised while configuring the coordinator or decoding messages
#[derive(Debug, Error)]
pub enum PopupAuthError {
    /// Settings are missing or inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider id is malformed or registered twice
    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    /// A configured URL could not be parsed or joined
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A cross-window message did not match the wire contract
    #[error("Message protocol error: {0}")]
    Protocol(String),

    /// The login-dispatch collaborator refused the session
    #[error("Login dispatch failed: {0}")]
    LoginDispatch(String),
}

/// Reasons `start_authorization` refuses to open a popup
///
/// None of these create a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("an authorization popup is already open")]
    SessionActive,

    #[error("popup window was blocked")]
    PopupBlocked,

    #[error("cannot build authorization URL: {0}")]
    InvalidUrl(String),

    #[error("no async runtime available to drive the popup session")]
    NoRuntime,
}

impl StartError {
    /// User-facing notice for this failure, if one should be shown
    #[must_use]
    pub fn user_notice(&self) -> Option<String> {
        match self {
            StartError::UnknownProvider(provider) => {
                Some(format!("Sign-in with '{provider}' is not supported."))
            }
            StartError::PopupBlocked => Some(
                "Popup blocked. Please allow popups for this site and try again.".to_string(),
            ),
            StartError::InvalidUrl(_) => {
                Some("Sign-in is unavailable right now. Please try again later.".to_string())
            }
            StartError::SessionActive | StartError::NoRuntime => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_error_notices() {
        assert!(StartError::PopupBlocked.user_notice().is_some());
        assert!(StartError::UnknownProvider("myspace".into())
            .user_notice()
            .unwrap()
            .contains("myspace"));
        assert!(StartError::SessionActive.user_notice().is_none());
        assert!(StartError::NoRuntime.user_notice().is_none());
    }

    #[test]
    fn test_url_error_converts() {
        let err: PopupAuthError = url::Url::parse("not a url").unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid URL"));
    }
}
