//! Page operations the portal session is written against.

use crate::error::Result;

/// Operations on the single page a lookup runs in.
///
/// Selectors are CSS selectors. Element lookups wait for the element to
/// appear; one that never shows up fails with
/// [`BrowserError::SelectorNotFound`](crate::BrowserError::SelectorNotFound).
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Load `url` in the page
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Focus the input at `selector` and type `value` into it
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    /// Click the element at `selector`
    async fn click(&self, selector: &str) -> Result<()>;

    /// Wait up to `timeout_ms` for `selector` to be present.
    ///
    /// Fails with [`BrowserError::Timeout`](crate::BrowserError::Timeout) when it is not.
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Rendered text of the element at `selector`, empty if it has none
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Full-page PNG capture
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Release the browser session. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}
