//! Reconnection with exponential backoff.
//!
//! [`ReconnectState`] computes exponentially increasing delays with jitter.
//! It drives two paths: the caller-triggered
//! [`crate::NetClient::reconnect_with_backoff`] loop, and the implicit
//! reconnect a failed `send` may start, which is limited to one attempt per
//! backoff window via [`ReconnectState::try_begin`].

use std::time::{Duration, Instant};

use rand::Rng;

/// Configuration for client-side reconnection behaviour.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial delay before the first reconnection attempt. Default: 1 s.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt. Default: 2.0.
    pub backoff_multiplier: f64,
    /// Maximum delay between reconnection attempts. Default: 30 s.
    pub max_delay: Duration,
    /// Maximum number of reconnection attempts before giving up. Default: 20.
    pub max_attempts: u32,
    /// Jitter factor (0.0–1.0). Applied as ±jitter to the delay. Default: 0.25.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            max_attempts: 20,
            jitter: 0.25,
        }
    }
}

/// Tracks reconnection attempt count and computes the next backoff delay.
#[derive(Debug)]
pub struct ReconnectState {
    config: ReconnectConfig,
    attempts: u32,
    current_delay: Duration,
    /// Earliest instant at which [`Self::try_begin`] admits another attempt.
    not_before: Option<Instant>,
}

impl ReconnectState {
    /// Create a new state from the given config.
    pub fn new(config: ReconnectConfig) -> Self {
        let initial = config.initial_delay;
        Self {
            config,
            attempts: 0,
            current_delay: initial,
            not_before: None,
        }
    }

    /// Compute the next delay and advance the attempt counter.
    /// Returns `None` if max attempts have been exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }

        let base = self.current_delay;
        self.attempts += 1;

        // Uniform random in [base * (1 - jitter), base * (1 + jitter)]
        let jittered = if self.config.jitter > 0.0 {
            let mut rng = rand::rng();
            let factor = rng.random_range((1.0 - self.config.jitter)..=(1.0 + self.config.jitter));
            base.mul_f64(factor)
        } else {
            base
        };

        let next = self.current_delay.mul_f64(self.config.backoff_multiplier);
        self.current_delay = next.min(self.config.max_delay);

        Some(jittered.min(self.config.max_delay))
    }

    /// Admit at most one immediate attempt per backoff window.
    ///
    /// Returns `true` when the caller may attempt a reconnect now; the next
    /// window is then `now + next_delay()`. Returns `false` while inside the
    /// current window or once attempts are exhausted.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if let Some(not_before) = self.not_before {
            if now < not_before {
                return false;
            }
        }
        match self.next_delay() {
            Some(delay) => {
                self.not_before = Some(now + delay);
                true
            }
            None => false,
        }
    }

    /// Reset the reconnection state (called after a successful connect).
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_delay = self.config.initial_delay;
        self.not_before = None;
    }

    /// Return the number of attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
