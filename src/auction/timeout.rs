//! Auction deadlines.
//!
//! `AdaptiveTimeout` is the process-wide deadline new connectors start
//! with. It begins at the configured default and may be raised or lowered
//! exactly once, from the first successful auction that reports the
//! server's own processing time. `Countdown` is the per-connector timer
//! raced against the network exchange.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::TimeoutConfig;

/// High bit of the state word marks "already updated".
const UPDATED: u64 = 1 << 63;

/// Shared, self-tuning auction timeout.
#[derive(Debug)]
pub struct AdaptiveTimeout {
    state: AtomicU64,
    default_ms: u64,
    upper_bound_ms: u64,
    safety_margin_ms: u64,
}

impl AdaptiveTimeout {
    pub fn new(default_ms: u64, upper_bound_ms: u64, safety_margin_ms: u64) -> Self {
        Self {
            state: AtomicU64::new(default_ms & !UPDATED),
            default_ms: default_ms & !UPDATED,
            upper_bound_ms: upper_bound_ms & !UPDATED,
            safety_margin_ms,
        }
    }

    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self::new(
            config.default_ms,
            config.upper_bound_ms,
            config.safety_margin_ms,
        )
    }

    /// Current timeout in milliseconds.
    pub fn current_ms(&self) -> u64 {
        self.state.load(Ordering::Acquire) & !UPDATED
    }

    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms())
    }

    /// Whether the one-time adjustment has happened.
    pub fn is_updated(&self) -> bool {
        self.state.load(Ordering::Acquire) & UPDATED != 0
    }

    /// Offer an observation from a successful auction.
    ///
    /// The new value is `round_trip + suggested + margin`, capped at the
    /// upper bound. Returns the value if this call performed the update;
    /// `None` if another observation already did.
    pub fn observe(&self, round_trip: Duration, suggested_ms: u64) -> Option<u64> {
        let rtt_ms = u64::try_from(round_trip.as_millis()).unwrap_or(u64::MAX);
        let candidate = rtt_ms
            .saturating_add(suggested_ms)
            .saturating_add(self.safety_margin_ms)
            .min(self.upper_bound_ms);

        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & UPDATED != 0 {
                return None;
            }
            match self.state.compare_exchange_weak(
                current,
                candidate | UPDATED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(candidate),
                Err(actual) => current = actual,
            }
        }
    }

    /// Return to the configured default and allow another update.
    pub fn reset(&self) {
        self.state.store(self.default_ms, Ordering::Release);
    }
}

/// One-shot timer for a single connector.
///
/// The timer starts when `expired()` is first polled. Once cancelled it
/// never fires.
#[derive(Debug)]
pub struct Countdown {
    duration: Duration,
    cancel: CancellationToken,
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            cancel: CancellationToken::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Resolves when the duration elapses. Pending forever if cancelled first.
    pub async fn expired(&self) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(self.duration) => return,
        }
        std::future::pending::<()>().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
