//! Configuration management for labwatch.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Every value has a default matching the
//! lab portal the tool was built for, so running without a config file works.

use crate::error::{ConfigError, ConfigResult};
use crate::types::UnrecognizedPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the sample identifier in phrase templates.
pub const SAMPLE_ID_PLACEHOLDER: &str = "{sample_id}";

/// Main application configuration.
///
/// This is loaded from `~/.config/labwatch/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote portal location, selectors and result phrases
    pub portal: PortalConfig,
    /// Polling cadence and classification policy
    pub polling: PollingConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Evidence output settings
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from the XDG path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file. The file must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `LABWATCH_HEADLESS`: Override browser headless mode (true/false)
    /// - `LABWATCH_EVIDENCE_PATH`: Override where the result capture is written
    /// - `LABWATCH_UNRECOGNIZED`: Override the unrecognized-result policy
    pub fn load_with_env(explicit_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides using `lookup` to resolve environment variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("LABWATCH_HEADLESS") {
            let headless = val
                .parse::<bool>()
                .map_err(|_| ConfigError::invalid("LABWATCH_HEADLESS", "expected true or false"))?;
            self.browser.headless = headless;
            tracing::debug!("Override browser.headless from env: {}", headless);
        }

        if let Some(val) = lookup("LABWATCH_EVIDENCE_PATH") {
            tracing::debug!("Override output.evidence_path from env: {}", val);
            self.output.evidence_path = PathBuf::from(val);
        }

        if let Some(val) = lookup("LABWATCH_UNRECOGNIZED") {
            let policy = val
                .parse::<UnrecognizedPolicy>()
                .map_err(|reason: String| ConfigError::invalid("LABWATCH_UNRECOGNIZED", reason))?;
            self.polling.on_unrecognized = policy;
            tracing::debug!("Override polling.on_unrecognized from env: {}", policy);
        }

        Ok(())
    }

    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        url::Url::parse(&self.portal.entry_url)
            .map_err(|e| ConfigError::invalid("portal.entry_url", e.to_string()))?;

        let selectors = [
            ("portal.form_link", &self.portal.form_link),
            ("portal.sample_id_input", &self.portal.sample_id_input),
            ("portal.service_date_input", &self.portal.service_date_input),
            ("portal.submit_button", &self.portal.submit_button),
            ("portal.result_message", &self.portal.result_message),
        ];
        for (field, selector) in selectors {
            if selector.trim().is_empty() {
                return Err(ConfigError::invalid(field, "selector must not be empty"));
            }
        }

        let phrases = [
            ("portal.phrases.not_received", &self.portal.phrases.not_received),
            ("portal.phrases.in_progress", &self.portal.phrases.in_progress),
            ("portal.phrases.complete", &self.portal.phrases.complete),
        ];
        for (field, template) in phrases {
            if !template.contains(SAMPLE_ID_PLACEHOLDER) {
                return Err(ConfigError::invalid(
                    field,
                    format!("template must contain {SAMPLE_ID_PLACEHOLDER}"),
                ));
            }
        }

        if self.output.evidence_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid(
                "output.evidence_path",
                "path must not be empty",
            ));
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/labwatch/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "labwatch", "labwatch").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Remote portal settings.
///
/// The portal has no deep link to the lookup form, so `form_link` is clicked
/// on the entry page before the form fields are reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Entry page URL
    pub entry_url: String,
    /// Link that leads from the entry page to the lookup form
    pub form_link: String,
    /// How long to wait for the form after following the link, in milliseconds
    pub form_timeout_ms: u64,
    /// Sample identifier input
    pub sample_id_input: String,
    /// Date of service input
    pub service_date_input: String,
    /// Form submit control
    pub submit_button: String,
    /// Element holding the result message
    pub result_message: String,
    /// Result sentences the portal renders
    pub phrases: PhraseConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            entry_url: "https://clientportal.aegislabs.com/Home/Login".to_string(),
            form_link: "#patcov".to_string(),
            form_timeout_ms: 30_000,
            sample_id_input: "#labid".to_string(),
            service_date_input: "#dateofservice".to_string(),
            submit_button: "#btnFindSample".to_string(),
            result_message: "#covMessage".to_string(),
            phrases: PhraseConfig::default(),
        }
    }
}

/// Phrase templates, each containing [`SAMPLE_ID_PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    /// Sample has not reached the lab yet
    pub not_received: String,
    /// Sample is being tested
    pub in_progress: String,
    /// Testing finished
    pub complete: String,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            not_received: "Sample {sample_id} has not been received at our laboratory"
                .to_string(),
            in_progress: "Sample {sample_id} has been received and testing is in progress"
                .to_string(),
            complete: "Sample {sample_id} was found and testing is complete. Enter the following as they appear on the requisition."
                .to_string(),
        }
    }
}

/// Polling cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Fixed part of the wait between attempts, in milliseconds
    pub backoff_base_ms: u64,
    /// Upper bound (exclusive) of the random addition to the backoff, in milliseconds
    pub backoff_jitter_ms: u64,
    /// Upper bound of the random delay before pressing submit, in milliseconds
    pub submit_delay_max_ms: u64,
    /// Fixed wait after submitting before reading the result, in milliseconds
    pub settle_delay_ms: u64,
    /// Handling of result text that matches no known phrase
    pub on_unrecognized: UnrecognizedPolicy,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 1_200_000, // 20 minutes
            backoff_jitter_ms: 60_000,
            submit_delay_max_ms: 10_000,
            settle_delay_ms: 1_000,
            on_unrecognized: UnrecognizedPolicy::Review,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// How long to wait for an element to appear, in milliseconds
    pub element_timeout_ms: u64,
    /// Pick a random user agent and viewport per session
    pub randomize_fingerprint: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1366,
            window_height: 768,
            element_timeout_ms: 30_000,
            randomize_fingerprint: true,
        }
    }
}

/// Evidence output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the final page capture is written (relative paths resolve against the working directory)
    pub evidence_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            evidence_path: PathBuf::from("result.png"),
        }
    }
}
