//! Confirmation polling for asynchronous deletes

use crate::error::{NukeError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// What a probe observed about a resource after its delete call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// The resource no longer exists
    Gone,
    /// Still present, deletion in progress
    Pending,
    /// Deletion will never complete (e.g., "DELETE_FAILED")
    Terminal(String),
}

/// Backoff stops growing after this many probes
const MAX_BACKOFF_EXPONENT: u32 = 63;

/// Bounded polling policy
#[derive(Debug, Clone)]
pub struct ConfirmPolicy {
    /// Maximum number of probes
    pub max_attempts: u32,

    /// Delay after the first unsuccessful probe
    pub interval: Duration,

    /// Multiplier applied to the delay after every probe (1.0 = fixed)
    pub backoff_multiplier: f64,

    /// Upper bound for the delay
    pub max_interval: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(2),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_secs(30),
        }
    }
}

impl ConfirmPolicy {
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            backoff_multiplier: 1.0,
            max_interval: interval,
        }
    }

    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    /// Delay to sleep after probe number `attempt` (zero-based)
    ///
    /// Computed in seconds and capped before the `Duration` is built, so any
    /// attempt count or multiplier stays within `max_interval`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let cap = self.max_interval.max(self.interval);
        let exponent = attempt.min(MAX_BACKOFF_EXPONENT) as i32;
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        if factor <= 1.0 {
            return self.interval;
        }
        let secs = self.interval.as_secs_f64() * factor;
        if secs.is_finite() && secs < cap.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            cap
        }
    }
}

/// Poll `probe` until the resource is gone
///
/// A [`NukeError::NotFound`] from the probe counts as gone. A terminal state
/// fails immediately. Other probe errors are logged and polling continues.
/// After `max_attempts` probes without success the result is
/// [`NukeError::ConfirmationTimeout`].
pub async fn wait_until_gone<F, Fut>(
    identifier: &str,
    policy: &ConfirmPolicy,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProbeStatus>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 0..max_attempts {
        match probe().await {
            Ok(ProbeStatus::Gone) => {
                debug!(identifier = %identifier, attempts = attempt + 1, "Deletion confirmed");
                return Ok(());
            }
            Err(e) if e.is_not_found() => {
                debug!(identifier = %identifier, attempts = attempt + 1, "Deletion confirmed");
                return Ok(());
            }
            Ok(ProbeStatus::Terminal(state)) => {
                warn!(identifier = %identifier, state = %state, "Deletion reached terminal state");
                return Err(NukeError::TerminalState {
                    identifier: identifier.to_string(),
                    state,
                });
            }
            Ok(ProbeStatus::Pending) => {}
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "Confirmation probe failed");
            }
        }

        if attempt + 1 < max_attempts {
            let delay = policy.delay_for_attempt(attempt);
            debug!(
                identifier = %identifier,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Resource still present, retrying"
            );
            sleep(delay).await;
        }
    }

    Err(NukeError::ConfirmationTimeout {
        identifier: identifier.to_string(),
        attempts: max_attempts,
    })
}
