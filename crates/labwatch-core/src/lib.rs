//! Labwatch Core - Foundation crate for the labwatch sample poller.
//!
//! This crate provides the shared types, error handling and configuration
//! management that the browser, poller and CLI crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared domain types (`LookupRequest`, `UnrecognizedPolicy`)
//!
//! # Example
//!
//! ```rust
//! use labwatch_core::{AppConfig, LookupRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//!
//! let request = LookupRequest::new("ABC123", "01/02/2024");
//! assert_eq!(request.sample_id(), "ABC123");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, OutputConfig, PhraseConfig, PollingConfig, PortalConfig,
    SAMPLE_ID_PLACEHOLDER,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{LookupRequest, UnrecognizedPolicy};
