//! Identity provider registry
//!
//! Static description of the providers a popup can be opened for. The
//! registry is built once and handed to the coordinator, so tests can swap
//! in their own provider set.

use crate::errors::PopupAuthError;
use crate::settings::{PopupAuthSettings, ProviderSettings};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use url::Url;

// Provider ids end up as a URL path segment
static PROVIDER_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,31}$").expect("valid provider id pattern"));

/// Display and routing data for one identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    pub icon: Option<String>,
    pub button_class: Option<String>,
    /// Segment after `/auth/` in the authorization URL
    pub auth_path: String,
}

impl ProviderDescriptor {
    #[must_use]
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            icon: None,
            button_class: None,
            auth_path: id.to_string(),
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    #[must_use]
    pub fn with_button_class(mut self, class: &str) -> Self {
        self.button_class = Some(class.to_string());
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: &str) -> Self {
        self.auth_path = path.to_string();
        self
    }

    fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            id: settings.id.clone(),
            display_name: settings.get_display_name().to_string(),
            icon: settings.icon.clone(),
            button_class: settings.button_class.clone(),
            auth_path: settings
                .auth_path
                .clone()
                .unwrap_or_else(|| settings.id.clone()),
        }
    }
}

/// Immutable lookup table `provider id -> descriptor`
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Build a registry from descriptors
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An id is not lowercase alphanumeric (plus `-`/`_`, max 32 chars)
    /// - An auth path is empty or contains `/`
    /// - An id appears twice
    pub fn new(descriptors: Vec<ProviderDescriptor>) -> Result<Self, PopupAuthError> {
        let mut providers = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if !PROVIDER_ID_PATTERN.is_match(&descriptor.id) {
                return Err(PopupAuthError::InvalidProvider(format!(
                    "'{}' is not a valid provider id",
                    descriptor.id
                )));
            }
            if descriptor.auth_path.is_empty() || descriptor.auth_path.contains('/') {
                return Err(PopupAuthError::InvalidProvider(format!(
                    "provider '{}' has invalid auth path '{}'",
                    descriptor.id, descriptor.auth_path
                )));
            }
            let id = descriptor.id.clone();
            if providers.insert(id.clone(), descriptor).is_some() {
                return Err(PopupAuthError::InvalidProvider(format!(
                    "provider '{id}' registered twice"
                )));
            }
        }

        Ok(Self { providers })
    }

    /// Registry of the enabled providers in `settings`
    ///
    /// # Errors
    ///
    /// Returns an error if a provider entry is invalid (see [`ProviderRegistry::new`])
    pub fn from_settings(settings: &PopupAuthSettings) -> Result<Self, PopupAuthError> {
        Self::new(
            settings
                .get_enabled_providers()
                .into_iter()
                .map(ProviderDescriptor::from_settings)
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.providers.get(id)
    }

    #[must_use]
    pub fn is_known(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Registered ids in sorted order
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Display name for a provider, falling back to the raw id
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, |p| p.display_name.as_str())
    }

    /// `{base_auth_url}/auth/{auth_path}` for a registered provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unknown or the base URL does not parse
    pub fn authorization_url(&self, base_auth_url: &str, id: &str) -> Result<Url, PopupAuthError> {
        let provider = self.get(id).ok_or_else(|| {
            PopupAuthError::InvalidProvider(format!("provider '{id}' is not registered"))
        })?;
        let base = base_auth_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/auth/{}", provider.auth_path))?)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let providers = [
            ProviderDescriptor::new("google", "Google")
                .with_icon("google")
                .with_button_class("btn-google"),
            ProviderDescriptor::new("github", "GitHub")
                .with_icon("github")
                .with_button_class("btn-github"),
        ]
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();
        Self { providers }
    }
}
