use crate::errors::PopupAuthError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the settings file looked up in the working directory and in
/// `POPUP_AUTH_CONFIG_DIR`
pub const SETTINGS_FILE: &str = "PopupAuth.toml";

/// Upper bound for `popup.timeout_secs` (one day)
pub const MAX_TIMEOUT_SECS: u64 = 86_400;
/// Upper bound for `popup.liveness_interval_ms` and `popup.retry_delay_ms`
pub const MAX_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupAuthSettings {
    pub api: ApiSettings,
    pub popup: PopupSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
    pub providers: Vec<ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the backend API; authorization popups open at
    /// `{base_url}/auth/{provider}`
    pub base_url: String,
    /// Path suffix stripped from `base_url` to obtain the origin that
    /// popup messages must come from
    pub api_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupSettings {
    pub width: u32,
    pub height: u32,
    pub window_name: String,
    /// How often the coordinator checks whether the user closed the popup.
    /// Bounds the latency of silent-cancel detection.
    pub liveness_interval_ms: u64,
    pub timeout_secs: u64,
    /// Delay before an `AUTH_RETRY` re-opens the popup
    pub retry_delay_ms: u64,
    /// Re-open automatically on `AUTH_RETRY`; when false the attempt ends
    /// as cancelled and the caller decides
    pub auto_retry: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub remember_me: bool,
    pub default_redirect: String,
    pub admin_redirect: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub id: String,
    pub display_name: Option<String>,
    pub icon: Option<String>,
    pub button_class: Option<String>,
    /// Path segment after `/auth/`; defaults to `id`
    pub auth_path: Option<String>,
    pub enabled: bool,
}

impl Default for PopupAuthSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            popup: PopupSettings::default(),
            session: SessionSettings::default(),
            logging: LoggingSettings::default(),
            providers: Self::default_providers(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            api_suffix: "/api".to_string(),
        }
    }
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            width: 500,
            height: 600,
            window_name: "oauth_popup".to_string(),
            liveness_interval_ms: 1000,
            timeout_secs: 300,
            retry_delay_ms: 500,
            auto_retry: true,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            remember_me: true,
            default_redirect: "/".to_string(),
            admin_redirect: "/admin/dashboard".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            id: String::new(),
            display_name: None,
            icon: None,
            button_class: None,
            auth_path: None,
            enabled: true,
        }
    }
}

impl ProviderSettings {
    /// Enabled provider entry with no display overrides
    #[must_use]
    pub fn named(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Display name, falling back to the id
    #[must_use]
    pub fn get_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

impl PopupAuthSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A settings file cannot be read or parsed
    /// - The resulting settings fail validation
    pub fn load() -> Result<Self, PopupAuthError> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        settings.validate()?;
        settings.initialize_logging();
        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. `PopupAuth.toml` in `POPUP_AUTH_CONFIG_DIR` (if specified and exists)
    /// 3. `PopupAuth.toml` in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    pub fn load_base_settings() -> Result<Self, PopupAuthError> {
        let mut settings = Self::default();

        let default_config_path = Path::new(SETTINGS_FILE);
        if default_config_path.exists() {
            settings = Self::load_file(default_config_path)?;
            log::info!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(config_dir) = std::env::var("POPUP_AUTH_CONFIG_DIR") {
            let config_path = Path::new(&config_dir).join(SETTINGS_FILE);
            if config_path.exists() {
                settings = Self::load_file(&config_path)?;
                log::info!("✓ Overriding settings from {}", config_path.display());
            } else {
                log::info!(
                    "ℹ POPUP_AUTH_CONFIG_DIR set but no {SETTINGS_FILE} found at: {}",
                    config_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn load_file(path: &Path) -> Result<Self, PopupAuthError> {
        let content = fs::read_to_string(path).map_err(|e| {
            PopupAuthError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        basic_toml::from_str(&content).map_err(|e| {
            PopupAuthError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Providers offered when the settings name none
    #[must_use]
    pub fn default_providers() -> Vec<ProviderSettings> {
        vec![
            ProviderSettings {
                id: "google".to_string(),
                display_name: Some("Google".to_string()),
                icon: Some("google".to_string()),
                button_class: Some("btn-google".to_string()),
                auth_path: None,
                enabled: true,
            },
            ProviderSettings {
                id: "github".to_string(),
                display_name: Some("GitHub".to_string()),
                icon: Some("github".to_string()),
                button_class: Some("btn-github".to_string()),
                auth_path: None,
                enabled: true,
            },
        ]
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_api_env_overrides(&mut settings.api);
        Self::apply_popup_env_overrides(&mut settings.popup);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_api_env_overrides(api_settings: &mut ApiSettings) {
        if let Ok(base_url) = std::env::var("POPUP_AUTH_API_URL") {
            api_settings.base_url = base_url;
        }
        if let Ok(suffix) = std::env::var("POPUP_AUTH_API_SUFFIX") {
            api_settings.api_suffix = suffix;
        }
    }

    fn apply_popup_env_overrides(popup_settings: &mut PopupSettings) {
        Self::apply_numeric_env_override("POPUP_AUTH_TIMEOUT_SECS", &mut popup_settings.timeout_secs);
        Self::apply_numeric_env_override(
            "POPUP_AUTH_LIVENESS_MS",
            &mut popup_settings.liveness_interval_ms,
        );
        Self::apply_numeric_env_override(
            "POPUP_AUTH_RETRY_DELAY_MS",
            &mut popup_settings.retry_delay_ms,
        );
        Self::apply_bool_env_override("POPUP_AUTH_AUTO_RETRY", &mut popup_settings.auto_retry);
    }

    fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        Self::apply_bool_env_override("POPUP_AUTH_REMEMBER_ME", &mut session_settings.remember_me);
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("POPUP_AUTH_LOG_LEVEL") {
            logging_settings.level = log_level;
        }
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    fn apply_bool_env_override(env_var: &str, target: &mut bool) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.trim().parse::<bool>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Install the `env_logger` backend at the configured level
    ///
    /// `RUST_LOG` still wins when set. A logger installed earlier by the
    /// embedding application is left in place.
    pub fn initialize_logging(&self) {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&self.logging.level);
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            builder.parse_filters(&rust_log);
        }
        if builder.try_init().is_err() {
            log::debug!("Logger already initialized, keeping existing configuration");
        }
    }

    /// Check the settings for values the coordinator cannot run with
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending value
    pub fn validate(&self) -> Result<(), PopupAuthError> {
        url::Url::parse(&self.api.base_url).map_err(|e| {
            PopupAuthError::Configuration(format!("api.base_url '{}': {e}", self.api.base_url))
        })?;
        if self.popup.width == 0 || self.popup.height == 0 {
            return Err(PopupAuthError::Configuration(
                "popup.width and popup.height must be non-zero".to_string(),
            ));
        }
        if !(1..=MAX_INTERVAL_MS).contains(&self.popup.liveness_interval_ms) {
            return Err(PopupAuthError::Configuration(format!(
                "popup.liveness_interval_ms must be between 1 and {MAX_INTERVAL_MS}"
            )));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.popup.timeout_secs) {
            return Err(PopupAuthError::Configuration(format!(
                "popup.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }
        if self.popup.retry_delay_ms > MAX_INTERVAL_MS {
            return Err(PopupAuthError::Configuration(format!(
                "popup.retry_delay_ms must be at most {MAX_INTERVAL_MS}"
            )));
        }
        if self.get_enabled_providers().is_empty() {
            return Err(PopupAuthError::Configuration(
                "at least one provider must be enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Get enabled providers
    #[must_use]
    pub fn get_enabled_providers(&self) -> Vec<&ProviderSettings> {
        self.providers.iter().filter(|p| p.enabled).collect()
    }

    /// Get provider by id
    #[must_use]
    pub fn get_provider(&self, id: &str) -> Option<&ProviderSettings> {
        self.providers.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.popup.liveness_interval_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.popup.timeout_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.popup.retry_delay_ms)
    }
}
