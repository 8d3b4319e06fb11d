//! Retry orchestrator.
//!
//! Drives the lookup until the portal reports a final result:
//!
//! ```text
//!              ┌──────────── backoff ─────────────┐
//!              v                                  │
//!   ──> Attempting ──NotReceived──> WaitingNotReceived
//!          │  │ └────InProgress───> WaitingInProgress
//!          │  └──Unrecognized (retry policy)──> WaitingUnrecognized
//!          └──Complete / Unrecognized──> Done
//! ```
//!
//! There is no attempt limit. The loop ends on a terminal outcome, on the
//! first automation error, or when a shutdown signal arrives between steps.
//! Once `Done` is reached the terminal handler always runs to completion.

use crate::backoff::Backoff;
use crate::classifier::{Classifier, Outcome, SampleStatus};
use crate::clock::Clock;
use crate::error::{PollError, Result};
use crate::evidence::EvidenceWriter;
use crate::session::SessionDriver;
use chrono::{DateTime, Local};
use labwatch_core::{AppConfig, LookupRequest, UnrecognizedPolicy};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// States of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// About to run one attempt
    Attempting,
    /// Backing off because the lab has not received the sample
    WaitingNotReceived,
    /// Backing off because testing is still running
    WaitingInProgress,
    /// Backing off after unrecognized text under the retry policy
    WaitingUnrecognized,
    /// Terminal
    Done,
}

/// One execution of the lookup pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based ordinal
    pub index: u32,
    /// When the attempt started
    pub started_at: DateTime<Local>,
    /// What the portal answered
    pub outcome: Outcome,
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A final result is available and evidence was captured
    Completed,
    /// The portal answered with text no phrase matched; a person has to look
    NeedsReview,
}

/// Summary handed back once the loop reaches [`PollState::Done`].
#[derive(Debug, Clone)]
pub struct PollReport {
    /// Attempts made
    pub attempts: u32,
    /// Backoff waits taken
    pub waits: u32,
    /// The attempt that ended the loop
    pub final_attempt: Attempt,
    /// How the run ended
    pub disposition: Disposition,
    /// Where evidence was written, if it was
    pub evidence_path: Option<PathBuf>,
}

/// The polling state machine.
///
/// Loop state (attempt counter, wait counter, latest attempt) lives here and
/// is only changed by [`Orchestrator::step`].
pub struct Orchestrator {
    request: LookupRequest,
    classifier: Classifier,
    backoff: Backoff,
    policy: UnrecognizedPolicy,
    evidence: EvidenceWriter,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    attempts: u32,
    waits: u32,
    last_attempt: Option<Attempt>,
}

impl Orchestrator {
    /// Create an orchestrator for `request`.
    pub fn new(
        request: LookupRequest,
        classifier: Classifier,
        backoff: Backoff,
        evidence: EvidenceWriter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            request,
            classifier,
            backoff,
            policy: UnrecognizedPolicy::default(),
            evidence,
            clock,
            rng: StdRng::from_entropy(),
            attempts: 0,
            waits: 0,
            last_attempt: None,
        }
    }

    /// Create an orchestrator wired from application configuration.
    pub fn from_config(request: LookupRequest, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            request,
            Classifier::new(config.portal.phrases.clone()),
            Backoff::from_config(&config.polling),
            EvidenceWriter::new(config.output.evidence_path.clone()),
            clock,
        )
        .with_policy(config.polling.on_unrecognized)
    }

    /// Set the handling of unrecognized result text.
    #[must_use]
    pub fn with_policy(mut self, policy: UnrecognizedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a specific random source for backoff jitter.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Attempts made so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Backoff waits taken so far.
    #[must_use]
    pub fn waits(&self) -> u32 {
        self.waits
    }

    /// The most recent attempt.
    #[must_use]
    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.last_attempt.as_ref()
    }

    /// Run the loop to completion and invoke the terminal handler.
    pub async fn run<D>(&mut self, driver: &mut D) -> Result<PollReport>
    where
        D: SessionDriver + ?Sized,
    {
        self.run_until(driver, std::future::pending()).await
    }

    /// Like [`Orchestrator::run`], but stop with [`PollError::Interrupted`]
    /// once `shutdown` resolves.
    ///
    /// The signal is checked before every step and can cut an attempt or a
    /// backoff wait short. It is not checked once the loop is `Done`, so a
    /// result that was found is always captured and reported.
    pub async fn run_until<D, S>(&mut self, driver: &mut D, shutdown: S) -> Result<PollReport>
    where
        D: SessionDriver + ?Sized,
        S: Future<Output = ()>,
    {
        info!(request = %self.request, "starting lookup");
        tokio::pin!(shutdown);

        let mut state = PollState::Attempting;
        while state != PollState::Done {
            let next = tokio::select! {
                biased;
                () = &mut shutdown => None,
                next = self.step(driver, state) => Some(next?),
            };
            match next {
                Some(next) => state = next,
                None => {
                    warn!(attempts = self.attempts, ?state, "shutdown requested, stopping");
                    return Err(PollError::Interrupted);
                }
            }
        }

        self.finish(driver).await
    }

    /// Perform the work of `state` and return the next state.
    pub async fn step<D>(&mut self, driver: &mut D, state: PollState) -> Result<PollState>
    where
        D: SessionDriver + ?Sized,
    {
        match state {
            PollState::Attempting => self.attempt(driver).await,
            PollState::WaitingNotReceived
            | PollState::WaitingInProgress
            | PollState::WaitingUnrecognized => {
                self.wait().await;
                Ok(PollState::Attempting)
            }
            PollState::Done => Ok(PollState::Done),
        }
    }

    /// State that follows an attempt classified as `status`.
    #[must_use]
    pub fn transition_for(&self, status: SampleStatus) -> PollState {
        match status {
            SampleStatus::NotReceived => PollState::WaitingNotReceived,
            SampleStatus::InProgress => PollState::WaitingInProgress,
            SampleStatus::Complete => PollState::Done,
            SampleStatus::Unrecognized => match self.policy {
                UnrecognizedPolicy::Retry => PollState::WaitingUnrecognized,
                UnrecognizedPolicy::Review | UnrecognizedPolicy::Complete => PollState::Done,
            },
        }
    }

    /// Draw the next backoff interval.
    pub fn next_backoff(&mut self) -> Duration {
        self.backoff.next_interval(&mut self.rng)
    }

    async fn attempt<D>(&mut self, driver: &mut D) -> Result<PollState>
    where
        D: SessionDriver + ?Sized,
    {
        self.attempts += 1;
        let index = self.attempts;
        let started_at = self.clock.now();
        info!(attempt = index, "=============== ATTEMPT {index} ===============");

        let raw_text = driver.submit_lookup(&self.request).await?;
        let outcome = self.classifier.classify(&raw_text, self.request.sample_id());
        let status = outcome.status();
        let next = self.transition_for(status);

        match status {
            SampleStatus::NotReceived | SampleStatus::InProgress => {
                let phrase = self
                    .classifier
                    .phrase(status, self.request.sample_id())
                    .unwrap_or_default();
                info!(attempt = index, %status, "[STATUS]: {phrase}");
            }
            SampleStatus::Complete => info!(attempt = index, %status, "testing is complete"),
            SampleStatus::Unrecognized => warn!(
                attempt = index,
                %status,
                policy = %self.policy,
                "result text matched no known phrase: {raw_text:?}"
            ),
        }
        debug!(attempt = index, ?next, "transition");

        self.last_attempt = Some(Attempt {
            index,
            started_at,
            outcome,
        });
        Ok(next)
    }

    async fn wait(&mut self) {
        let interval = self.next_backoff();
        let resume_at = self.clock.now()
            + chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
        self.waits += 1;

        info!(
            resume_at = %resume_at.format("%Y-%m-%d %H:%M:%S"),
            "scheduling retry, waiting for {}s",
            interval.as_secs()
        );
        self.clock.sleep(interval).await;
        info!("retrying");
    }

    /// Terminal handler: capture evidence for a completed result, or flag
    /// unrecognized text for review.
    async fn finish<D>(&mut self, driver: &mut D) -> Result<PollReport>
    where
        D: SessionDriver + ?Sized,
    {
        let final_attempt = self.last_attempt.clone().ok_or(PollError::NoAttempt)?;
        let completed = match final_attempt.outcome.status() {
            SampleStatus::Complete => true,
            SampleStatus::Unrecognized => self.policy == UnrecognizedPolicy::Complete,
            SampleStatus::NotReceived | SampleStatus::InProgress => false,
        };

        let (disposition, evidence_path) = if completed {
            info!(
                attempts = self.attempts,
                "[RESULT]: result found, possible result text: {}",
                final_attempt.outcome.raw_text()
            );
            let png = driver.capture_evidence().await?;
            let path = self.evidence.write(&png).await?;
            (Disposition::Completed, Some(path))
        } else {
            warn!(
                attempts = self.attempts,
                "result needs manual review: {}",
                final_attempt.outcome.raw_text()
            );
            (Disposition::NeedsReview, None)
        };

        Ok(PollReport {
            attempts: self.attempts,
            waits: self.waits,
            final_attempt,
            disposition,
            evidence_path,
        })
    }
}
