use crate::actions::BrowserActions;
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::stream::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// How often an absent element is looked up again while waiting for it.
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Options for launching the browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Window width, used when the fingerprint is not randomized
    pub window_width: u32,
    /// Window height, used when the fingerprint is not randomized
    pub window_height: u32,
    /// How long element lookups wait for the element to appear
    pub element_timeout: Duration,
    /// Pick a random user agent and viewport
    pub randomize_fingerprint: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1366,
            window_height: 768,
            element_timeout: Duration::from_secs(30),
            randomize_fingerprint: true,
        }
    }
}

/// Browser automation engine holding a single Chromium page.
pub struct BrowserEngine {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    element_timeout: Duration,
    closed: bool,
}

impl BrowserEngine {
    /// Launch Chromium and open the page all actions run against
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let fingerprint = options
            .randomize_fingerprint
            .then(FingerprintConfig::randomized);
        let (width, height) = fingerprint
            .as_ref()
            .map_or((options.window_width, options.window_height), |fp| {
                (fp.viewport_width, fp.viewport_height)
            });

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height);
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        if let Some(fp) = &fingerprint {
            page.set_user_agent(user_agent_override(fp))
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            tracing::debug!(
                user_agent = %fp.user_agent,
                viewport = %format!("{width}x{height}"),
                "applied randomized fingerprint"
            );
        }

        tracing::info!(headless = options.headless, "browser session started");

        Ok(Self {
            browser,
            page,
            handler,
            element_timeout: options.element_timeout,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(BrowserError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Find an element, waiting up to `timeout` for it to appear.
    async fn find_within(&self, selector: &str, timeout: Duration) -> Result<Element> {
        self.ensure_open()?;
        let deadline = Instant::now() + timeout;
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e) if Instant::now() >= deadline => {
                    return Err(BrowserError::SelectorNotFound(format!("{selector} ({e})")));
                }
                Err(_) => tokio::time::sleep(ELEMENT_POLL_INTERVAL).await,
            }
        }
    }

    async fn find(&self, selector: &str) -> Result<Element> {
        self.find_within(selector, self.element_timeout).await
    }
}

fn user_agent_override(fingerprint: &FingerprintConfig) -> SetUserAgentOverrideParams {
    SetUserAgentOverrideParams::new(fingerprint.user_agent.clone())
}

/// Only http(s) pages can be driven; anything else is rejected before Chromium sees it.
fn navigation_target(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("invalid URL {url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(BrowserError::NavigationError(format!("not a web page URL: {url}"))),
    }
}

/// An element still missing at the deadline is a timeout; other failures pass through.
fn wait_error(selector: &str, timeout_ms: u64, e: BrowserError) -> BrowserError {
    match e {
        BrowserError::SelectorNotFound(_) => {
            BrowserError::Timeout(format!("{selector} after {timeout_ms}ms"))
        }
        other => other,
    }
}

fn interaction_error(selector: &str, e: impl std::fmt::Display) -> BrowserError {
    BrowserError::InteractionError {
        selector: selector.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        let target = navigation_target(url)?;
        tracing::debug!(host = target.host_str().unwrap_or_default(), "navigating to {url}");

        self.page
            .goto(target.as_str())
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element
            .click()
            .await
            .map_err(|e| interaction_error(selector, e))?;
        element
            .type_str(value)
            .await
            .map_err(|e| interaction_error(selector, e))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element
            .click()
            .await
            .map_err(|e| interaction_error(selector, e))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        self.find_within(selector, Duration::from_millis(timeout_ms))
            .await
            .map(|_| ())
            .map_err(|e| wait_error(selector, timeout_ms, e))
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let element = self.find(selector).await?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| interaction_error(selector, e))?;
        Ok(text.unwrap_or_default())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()));
        if closed.is_ok() {
            if let Err(e) = self.browser.wait().await {
                tracing::warn!("browser process did not exit cleanly: {e}");
            }
        }
        self.handler.abort();
        tracing::info!("browser session closed");
        closed.map(|_| ())
    }
}
