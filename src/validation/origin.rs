use crate::errors::PopupAuthError;
use log::debug;
use url::Url;

/// Origin that popup messages must come from
///
/// The configured API base URL usually carries a path suffix such as
/// `/api`; the popup page is served by the same backend at its root, so the
/// suffix is stripped before the origin is taken.
///
/// # Errors
///
/// Returns an error if the base URL does not parse or has no host
pub fn backend_origin(base_url: &str, api_suffix: &str) -> Result<String, PopupAuthError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let suffix = api_suffix.trim_end_matches('/');
    let stripped = if suffix.is_empty() {
        trimmed
    } else {
        trimmed.strip_suffix(suffix).unwrap_or(trimmed)
    };

    let parsed = Url::parse(stripped)?;
    if parsed.host_str().is_none() {
        return Err(PopupAuthError::Configuration(format!(
            "base URL '{base_url}' has no host"
        )));
    }

    let origin = parsed.origin().ascii_serialization();
    debug!("Expecting popup messages from origin {origin}");
    Ok(origin)
}

/// Whether a received message origin is the expected backend origin
///
/// Opaque origins (`"null"`) never match.
#[must_use]
pub fn origin_matches(expected: &str, received: &str) -> bool {
    let received = received.trim().trim_end_matches('/');
    if received.is_empty() || received == "null" {
        return false;
    }
    received == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_origin_strips_api_suffix() {
        assert_eq!(
            backend_origin("http://localhost:5000/api", "/api").unwrap(),
            "http://localhost:5000"
        );
        assert_eq!(
            backend_origin("https://lms.example.com/api/", "/api").unwrap(),
            "https://lms.example.com"
        );
    }

    #[test]
    fn test_backend_origin_elides_default_port() {
        assert_eq!(
            backend_origin("https://lms.example.com:443/api", "/api").unwrap(),
            "https://lms.example.com"
        );
    }

    #[test]
    fn test_backend_origin_without_suffix_match() {
        // Only a trailing suffix is stripped; the origin ignores the path anyway
        assert_eq!(
            backend_origin("https://lms.example.com/v2", "/api").unwrap(),
            "https://lms.example.com"
        );
        assert_eq!(
            backend_origin("https://lms.example.com", "").unwrap(),
            "https://lms.example.com"
        );
    }

    #[test]
    fn test_backend_origin_rejects_garbage() {
        assert!(backend_origin("not a url", "/api").is_err());
        assert!(backend_origin("mailto:admin@example.com", "/api").is_err());
    }

    #[test]
    fn test_origin_matches() {
        let expected = "http://localhost:5000";
        assert!(origin_matches(expected, "http://localhost:5000"));
        assert!(origin_matches(expected, "http://localhost:5000/"));
        assert!(!origin_matches(expected, "http://localhost:5001"));
        assert!(!origin_matches(expected, "https://localhost:5000"));
        assert!(!origin_matches(expected, "http://localhost:5000.evil.com"));
        assert!(!origin_matches(expected, "null"));
        assert!(!origin_matches(expected, ""));
    }
}
