//! Session driver: one live lookup against the portal per call.

use crate::backoff::uniform_delay;
use crate::clock::Clock;
use crate::error::Result;
use async_trait::async_trait;
use labwatch_browser::BrowserActions;
use labwatch_core::{LookupRequest, PollingConfig, PortalConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// The automation surface the orchestrator drives.
///
/// Every call mutates remote state. Calling `submit_lookup` again performs a
/// fresh live submission, which is how the portal is polled.
#[async_trait]
pub trait SessionDriver: Send {
    /// Run one full navigate-fill-submit-read cycle and return the result text.
    async fn submit_lookup(&mut self, request: &LookupRequest) -> Result<String>;

    /// Capture the current page as PNG bytes.
    async fn capture_evidence(&mut self) -> Result<Vec<u8>>;

    /// Release the underlying session.
    async fn close(&mut self) -> Result<()>;
}

/// Pauses taken around the submit click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTiming {
    /// Upper bound of the random pause before clicking submit
    pub submit_delay_max: Duration,
    /// Fixed pause after clicking submit, before reading the result
    pub settle_delay: Duration,
}

impl SubmitTiming {
    /// Timing configured by the `[polling]` section.
    #[must_use]
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            submit_delay_max: Duration::from_millis(config.submit_delay_max_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }
}

impl Default for SubmitTiming {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

/// [`SessionDriver`] for the lab portal on top of any [`BrowserActions`].
pub struct PortalSession<A> {
    actions: A,
    portal: PortalConfig,
    timing: SubmitTiming,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl<A: BrowserActions> PortalSession<A> {
    /// Wrap an automation session.
    pub fn new(
        actions: A,
        portal: PortalConfig,
        timing: SubmitTiming,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            actions,
            portal,
            timing,
            clock,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a specific random source for the pre-submit pause.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// The wrapped automation session.
    pub fn actions(&self) -> &A {
        &self.actions
    }

    /// Load the entry page and follow the link to the lookup form.
    ///
    /// The portal offers no direct URL for the form.
    async fn open_form(&self) -> Result<()> {
        info!("navigating to lookup form");
        self.actions.navigate(&self.portal.entry_url).await?;
        self.actions.click(&self.portal.form_link).await?;
        self.actions
            .wait_for_selector(&self.portal.sample_id_input, self.portal.form_timeout_ms)
            .await?;
        Ok(())
    }

    async fn fill_and_submit(&mut self, request: &LookupRequest) -> Result<()> {
        info!("filling form");
        self.actions
            .fill_field(&self.portal.sample_id_input, request.sample_id())
            .await?;
        self.actions
            .fill_field(&self.portal.service_date_input, request.service_date())
            .await?;

        let pause = uniform_delay(self.timing.submit_delay_max, &mut self.rng);
        debug!("waiting {}ms before submitting", pause.as_millis());
        self.clock.sleep(pause).await;

        self.actions.click(&self.portal.submit_button).await?;
        Ok(())
    }

    async fn read_result(&self) -> Result<String> {
        self.clock.sleep(self.timing.settle_delay).await;
        info!("getting results");
        let text = self.actions.extract_text(&self.portal.result_message).await?;
        Ok(text)
    }
}

#[async_trait]
impl<A: BrowserActions> SessionDriver for PortalSession<A> {
    async fn submit_lookup(&mut self, request: &LookupRequest) -> Result<String> {
        self.open_form().await?;
        self.fill_and_submit(request).await?;
        self.read_result().await
    }

    async fn capture_evidence(&mut self) -> Result<Vec<u8>> {
        let png = self.actions.screenshot().await?;
        Ok(png)
    }

    async fn close(&mut self) -> Result<()> {
        self.actions.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::InstantClock;
    use labwatch_browser::{BrowserError, Result as BrowserResult};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Navigate(String),
        Fill(String, String),
        Click(String),
        Wait(String),
        Extract(String),
        Screenshot,
        Close,
    }

    #[derive(Default)]
    struct RecordingActions {
        calls: Mutex<Vec<Call>>,
        result_text: String,
        missing: Option<String>,
    }

    impl RecordingActions {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn check(&self, selector: &str) -> BrowserResult<()> {
            if self.missing.as_deref() == Some(selector) {
                Err(BrowserError::SelectorNotFound(selector.to_string()))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BrowserActions for RecordingActions {
        async fn navigate(&self, url: &str) -> BrowserResult<()> {
            self.record(Call::Navigate(url.to_string()));
            Ok(())
        }

        async fn fill_field(&self, selector: &str, value: &str) -> BrowserResult<()> {
            self.check(selector)?;
            self.record(Call::Fill(selector.to_string(), value.to_string()));
            Ok(())
        }

        async fn click(&self, selector: &str) -> BrowserResult<()> {
            self.check(selector)?;
            self.record(Call::Click(selector.to_string()));
            Ok(())
        }

        async fn wait_for_selector(&self, selector: &str, _timeout_ms: u64) -> BrowserResult<()> {
            self.check(selector)?;
            self.record(Call::Wait(selector.to_string()));
            Ok(())
        }

        async fn extract_text(&self, selector: &str) -> BrowserResult<String> {
            self.check(selector)?;
            self.record(Call::Extract(selector.to_string()));
            Ok(self.result_text.clone())
        }

        async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
            self.record(Call::Screenshot);
            Ok(b"\x89PNG".to_vec())
        }

        async fn close(&mut self) -> BrowserResult<()> {
            self.record(Call::Close);
            Ok(())
        }
    }

    fn portal_session(
        actions: RecordingActions,
        clock: Arc<InstantClock>,
    ) -> PortalSession<RecordingActions> {
        PortalSession::new(
            actions,
            PortalConfig::default(),
            SubmitTiming::default(),
            clock,
        )
        .with_rng(StdRng::seed_from_u64(3))
    }

    #[tokio::test]
    async fn test_submit_lookup_sequence() {
        let clock = Arc::new(InstantClock::new());
        let actions = RecordingActions {
            result_text: "Sample ABC123 has been received and testing is in progress".to_string(),
            ..RecordingActions::default()
        };
        let mut session = portal_session(actions, clock.clone());

        let text = session
            .submit_lookup(&LookupRequest::new("ABC123", "01/02/2024"))
            .await
            .unwrap();

        assert_eq!(
            text,
            "Sample ABC123 has been received and testing is in progress"
        );
        assert_eq!(
            session.actions().calls(),
            vec![
                Call::Navigate("https://clientportal.aegislabs.com/Home/Login".to_string()),
                Call::Click("#patcov".to_string()),
                Call::Wait("#labid".to_string()),
                Call::Fill("#labid".to_string(), "ABC123".to_string()),
                Call::Fill("#dateofservice".to_string(), "01/02/2024".to_string()),
                Call::Click("#btnFindSample".to_string()),
                Call::Extract("#covMessage".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_lookup_pauses() {
        let clock = Arc::new(InstantClock::new());
        let mut session = portal_session(RecordingActions::default(), clock.clone());

        session
            .submit_lookup(&LookupRequest::new("ABC123", "01/02/2024"))
            .await
            .unwrap();

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 2);
        assert!(sleeps[0] <= Duration::from_secs(10), "pre-submit {:?}", sleeps[0]);
        assert_eq!(sleeps[1], Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_missing_element_is_fatal() {
        let clock = Arc::new(InstantClock::new());
        let actions = RecordingActions {
            missing: Some("#covMessage".to_string()),
            ..RecordingActions::default()
        };
        let mut session = portal_session(actions, clock);

        let result = session
            .submit_lookup(&LookupRequest::new("ABC123", "01/02/2024"))
            .await;

        assert!(matches!(
            result,
            Err(crate::PollError::Browser(BrowserError::SelectorNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_capture_and_close_delegate() {
        let clock = Arc::new(InstantClock::new());
        let mut session = portal_session(RecordingActions::default(), clock);

        let png = session.capture_evidence().await.unwrap();
        session.close().await.unwrap();

        assert_eq!(png, b"\x89PNG".to_vec());
        assert_eq!(session.actions().calls(), vec![Call::Screenshot, Call::Close]);
    }
}
