//! Bounded waits for files to become visible.
//!
//! A download returning does not guarantee its file is visible yet. These
//! helpers poll with a fixed number of attempts and an explicit failure,
//! never an open-ended loop.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Polling schedule for [`wait_until_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Sleeps allowed after the initial check
    pub retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Growth factor per retry (1 = fixed interval)
    pub multiplier: u32,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl WaitPolicy {
    /// Same delay between every check.
    pub fn fixed(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            base_delay: delay,
            multiplier: 1,
            max_delay: delay,
        }
    }

    /// Doubling delays starting at `base_delay`.
    pub fn exponential(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
            multiplier: 2,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Merge wait for adaptive downloads: 1s, 2s, 4s, 8s.
    pub fn merge_default() -> Self {
        Self::exponential(4, Duration::from_secs(1))
    }

    /// Visibility wait after resolving a source: 20 checks 500ms apart.
    pub fn visibility_default() -> Self {
        Self::fixed(20, Duration::from_millis(500))
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Every delay in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.retries).map(move |attempt| self.delay_for_attempt(attempt))
    }

    /// Total number of existence checks.
    pub fn checks(&self) -> u32 {
        self.retries + 1
    }
}

/// Why a wait ended without every path present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// Checks exhausted; lists the paths still missing
    Exhausted { missing: Vec<PathBuf>, checks: u32 },
    /// The cancel signal fired
    Cancelled,
}

/// Wait until every path exists, following `policy`.
pub async fn wait_until_exists<P: AsRef<Path>>(
    paths: &[P],
    policy: &WaitPolicy,
    cancel: Option<watch::Receiver<bool>>,
) -> Result<(), WaitError> {
    let mut cancel = cancel;

    for (attempt, delay) in std::iter::once(Duration::ZERO).chain(policy.delays()).enumerate() {
        if !delay.is_zero() {
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting for files to appear");
            sleep_or_cancel(delay, cancel.as_mut()).await?;
        }

        if missing(paths).is_empty() {
            return Ok(());
        }
    }

    Err(WaitError::Exhausted {
        missing: missing(paths),
        checks: policy.checks(),
    })
}

fn missing<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.is_file())
        .map(Path::to_path_buf)
        .collect()
}

async fn sleep_or_cancel(
    delay: Duration,
    cancel: Option<&mut watch::Receiver<bool>>,
) -> Result<(), WaitError> {
    let Some(rx) = cancel else {
        tokio::time::sleep(delay).await;
        return Ok(());
    };

    if *rx.borrow() {
        return Err(WaitError::Cancelled);
    }

    let deadline = tokio::time::Instant::now() + delay;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return Ok(()),
            changed = rx.changed() => {
                if changed.is_err() {
                    // Sender gone: nobody can cancel any more
                    tokio::time::sleep_until(deadline).await;
                    return Ok(());
                }
            }
        }

        let cancelled = *rx.borrow();
        if cancelled {
            return Err(WaitError::Cancelled);
        }
    }
}
