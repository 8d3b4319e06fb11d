//! Labwatch command line shell.
//!
//! Parses the lookup arguments, loads configuration, owns the browser
//! session for the whole run and always closes it before exiting. The
//! polling logic lives in `crates/labwatch-poller`.

use anyhow::{Context, Result};
use clap::Parser;
use labwatch_browser::{BrowserEngine, LaunchOptions};
use labwatch_core::{AppConfig, LookupRequest};
use labwatch_poller::{
    Clock, Disposition, Orchestrator, PollError, PollReport, PortalSession, SessionDriver,
    SubmitTiming, SystemClock,
};
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Exit status when the portal answered with text that needs a human.
const EXIT_NEEDS_REVIEW: u8 = 2;

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// Poll the lab portal until the sample's result is available.
#[derive(Debug, Parser)]
#[command(name = "labwatch", version)]
struct Cli {
    /// Sample (requisition) identifier, typed into the portal as given
    sample_id: String,

    /// Date of service, typed into the portal as given
    service_date: String,

    /// Read configuration from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,labwatch_poller=debug,chromiumoxide=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn launch_options(config: &AppConfig) -> LaunchOptions {
    LaunchOptions {
        headless: config.browser.headless,
        window_width: config.browser.window_width,
        window_height: config.browser.window_height,
        element_timeout: Duration::from_millis(config.browser.element_timeout_ms),
        randomize_fingerprint: config.browser.randomize_fingerprint,
    }
}

fn exit_status(disposition: Disposition) -> u8 {
    match disposition {
        Disposition::Completed => 0,
        Disposition::NeedsReview => EXIT_NEEDS_REVIEW,
    }
}

fn print_report(report: &PollReport) {
    match report.disposition {
        Disposition::Completed => {
            println!("[RESULT]: RESULT FOUND. PLEASE CHECK BROWSER FOR MORE INFO");
            println!("POSSIBLE RESULT TEXT:");
            println!("{}", report.final_attempt.outcome.raw_text());
            if let Some(path) = &report.evidence_path {
                println!("Screenshot saved to {}", path.display());
            }
        }
        Disposition::NeedsReview => {
            println!("[REVIEW]: The portal answered with unexpected text. Please check it manually:");
            println!("{}", report.final_attempt.outcome.raw_text());
        }
    }
    println!("Attempts: {}, waits: {}", report.attempts, report.waits);
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Poll until done or `shutdown`, then release the session whatever the outcome.
async fn drive<D, S>(orchestrator: &mut Orchestrator, session: &mut D, shutdown: S) -> Result<u8>
where
    D: SessionDriver + ?Sized,
    S: Future<Output = ()>,
{
    let finished = orchestrator.run_until(session, shutdown).await;

    if let Err(e) = session.close().await {
        warn!("failed to close browser session: {e}");
    }

    match finished {
        Ok(report) => {
            print_report(&report);
            Ok(exit_status(report.disposition))
        }
        Err(PollError::Interrupted) => {
            warn!(attempts = orchestrator.attempts(), "interrupted, stopping");
            Ok(EXIT_INTERRUPTED)
        }
        Err(e) => Err(e).context(format!(
            "lookup failed after {} attempt(s)",
            orchestrator.attempts()
        )),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load_with_env(cli.config.as_deref())
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let request = LookupRequest::new(cli.sample_id, cli.service_date);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    info!("setting up");
    let engine = BrowserEngine::launch(launch_options(&config))
        .await
        .context("failed to start browser")?;
    let mut session = PortalSession::new(
        engine,
        config.portal.clone(),
        SubmitTiming::from_config(&config.polling),
        clock.clone(),
    );
    let mut orchestrator = Orchestrator::from_config(request, &config, clock);

    let status = drive(&mut orchestrator, &mut session, ctrl_c()).await?;
    Ok(ExitCode::from(status))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting labwatch v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
