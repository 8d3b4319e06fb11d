//! Browser automation engine for the lab portal.
//!
//! Provides Chromium control with a randomized fingerprint behind the
//! [`BrowserActions`] trait, so callers can be tested without a browser.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::BrowserActions;
pub use engine::{BrowserEngine, LaunchOptions};
pub use error::{BrowserError, Result};
