//! Lab portal polling.
//!
//! Submits a sample lookup through the portal, classifies the answer and
//! waits with jittered backoff until testing is complete, then saves a
//! capture of the result page.
//!
//! # Modules
//!
//! - [`session`] - One live lookup per call through [`labwatch_browser::BrowserActions`]
//! - [`classifier`] - Result text to [`SampleStatus`] by phrase matching
//! - [`orchestrator`] - The retry state machine
//! - [`backoff`] - Randomized waits
//! - [`clock`] - Injectable time source
//! - [`evidence`] - Result capture persistence

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]

pub mod backoff;
pub mod classifier;
pub mod clock;
pub mod error;
pub mod evidence;
pub mod orchestrator;
pub mod session;

pub use backoff::Backoff;
pub use classifier::{classify, Classifier, Outcome, SampleStatus};
pub use clock::{Clock, InstantClock, SystemClock};
pub use error::{PollError, Result};
pub use evidence::EvidenceWriter;
pub use orchestrator::{Attempt, Disposition, Orchestrator, PollReport, PollState};
pub use session::{PortalSession, SessionDriver, SubmitTiming};
