use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use log::*;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// The longest pause the gate will accept. Longer requests are cut down to this.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// A single cooldown shared by every accrual worker.
///
/// When the accrual service rate-limits one worker, the whole pool must hold off. The gate stores one "not before"
/// instant. Workers call [`RateLimitGate::wait_until_open`] before every request, and whoever receives a 429 calls
/// [`RateLimitGate::pause_for`].
#[derive(Debug, Default)]
pub struct RateLimitGate {
    not_before: Mutex<Option<Instant>>,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the gate for at least `cooldown` from now, up to [`MAX_COOLDOWN`]. An existing, later deadline is never
    /// shortened.
    pub fn pause_for(&self, cooldown: Duration) -> Instant {
        let cooldown = cooldown.min(MAX_COOLDOWN);
        let requested = Instant::now() + cooldown;
        let mut not_before = self.not_before.lock().unwrap_or_else(PoisonError::into_inner);
        let deadline = match *not_before {
            Some(current) if current > requested => current,
            _ => requested,
        };
        *not_before = Some(deadline);
        debug!("🕰️ Accrual requests paused for {}s", cooldown.as_secs());
        deadline
    }

    /// The instant the gate reopens, if it is currently closed.
    pub fn reopens_at(&self) -> Option<Instant> {
        let not_before = *self.not_before.lock().unwrap_or_else(PoisonError::into_inner);
        not_before.filter(|t| *t > Instant::now())
    }

    pub fn is_open(&self) -> bool {
        self.reopens_at().is_none()
    }

    /// Waits until the gate is open. Returns `false` if `shutdown` fired first.
    ///
    /// The deadline is re-read after every sleep, since another worker may have extended it in the meantime.
    pub async fn wait_until_open(&self, shutdown: &CancellationToken) -> bool {
        loop {
            if shutdown.is_cancelled() {
                return false;
            }
            let Some(deadline) = self.reopens_at() else {
                return true;
            };
            trace!("🕰️ Waiting for the rate limit to expire");
            tokio::select! {
                _ = shutdown.cancelled() => return false,
                _ = sleep_until(deadline) => {},
            }
        }
    }
}
