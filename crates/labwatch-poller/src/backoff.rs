//! Randomized delays.
//!
//! Both the wait between attempts and the pause before pressing submit are
//! randomized, so the portal never sees a fixed polling interval.

use labwatch_core::PollingConfig;
use rand::Rng;
use std::time::Duration;

/// Jittered wait between unsuccessful attempts: `base + uniform[0, jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_ms: u64,
    jitter_ms: u64,
}

impl Backoff {
    /// Backoff configured by the `[polling]` section.
    #[must_use]
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            base_ms: config.backoff_base_ms,
            jitter_ms: config.backoff_jitter_ms,
        }
    }

    /// Inclusive lower and exclusive upper bound of [`Backoff::next_interval`].
    ///
    /// With zero jitter both bounds equal the base.
    #[must_use]
    pub fn bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.base_ms),
            Duration::from_millis(self.base_ms.saturating_add(self.jitter_ms)),
        )
    }

    /// Draw the next wait.
    pub fn next_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let extra = if self.jitter_ms == 0 {
            0
        } else {
            rng.gen_range(0..self.jitter_ms)
        };
        Duration::from_millis(self.base_ms.saturating_add(extra))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

/// Uniformly random delay in `[0, max]`.
pub fn uniform_delay<R: Rng + ?Sized>(max: Duration, rng: &mut R) -> Duration {
    Duration::from_millis(rng.gen_range(0..=duration_ms(max)))
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
