//! Per-client write rate limiter
//!
//! A client is identified by a key derived from its network origin, so clients
//! behind one NAT share a window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::utils::ceil_secs;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied { retry_after_secs: u64 },
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: Duration,
    /// client key → time of its last accepted write
    last_accepted: HashMap<String, Instant>,
}

impl RateLimiter {
    /// A zero window disables limiting
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Decide whether `client_key` may write at `now`. Does not record anything.
    pub fn check(&self, client_key: &str, now: Instant) -> RateDecision {
        if self.window.is_zero() {
            return RateDecision::Allowed;
        }

        let Some(&last) = self.last_accepted.get(client_key) else {
            return RateDecision::Allowed;
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.window {
            RateDecision::Allowed
        } else {
            RateDecision::Denied {
                retry_after_secs: ceil_secs(self.window - elapsed),
            }
        }
    }

    /// Mark a write from `client_key` as accepted at `now`
    pub fn record(&mut self, client_key: &str, now: Instant) {
        if self.window.is_zero() {
            return;
        }
        self.last_accepted.insert(client_key.to_string(), now);
    }

    /// Forget clients idle for longer than `retention`; returns how many
    pub fn prune(&mut self, now: Instant, retention: Duration) -> usize {
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, last| now.saturating_duration_since(*last) < retention);
        before - self.last_accepted.len()
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.last_accepted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: Duration = Duration::from_secs(10);

    #[test]
    fn test_first_write_allowed() {
        let limiter = RateLimiter::new(W);
        assert_eq!(limiter.check("1.2.3.4", Instant::now()), RateDecision::Allowed);
    }

    #[test]
    fn test_second_write_within_window_denied() {
        let mut limiter = RateLimiter::new(W);
        let t0 = Instant::now();
        limiter.record("1.2.3.4", t0);

        let decision = limiter.check("1.2.3.4", t0 + Duration::from_millis(9_999));
        assert_eq!(decision, RateDecision::Denied { retry_after_secs: 1 });

        let decision = limiter.check("1.2.3.4", t0 + Duration::from_millis(2_500));
        assert_eq!(decision, RateDecision::Denied { retry_after_secs: 8 });
    }

    #[test]
    fn test_write_at_window_boundary_allowed() {
        let mut limiter = RateLimiter::new(W);
        let t0 = Instant::now();
        limiter.record("1.2.3.4", t0);

        assert_eq!(limiter.check("1.2.3.4", t0 + W), RateDecision::Allowed);
        assert_eq!(
            limiter.check("1.2.3.4", t0 + W + Duration::from_secs(1)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let mut limiter = RateLimiter::new(W);
        let t0 = Instant::now();
        limiter.record("1.2.3.4", t0);
        assert_eq!(limiter.check("5.6.7.8", t0), RateDecision::Allowed);
    }

    #[test]
    fn test_zero_window_disables_limiting() {
        let mut limiter = RateLimiter::new(Duration::ZERO);
        let t0 = Instant::now();
        limiter.record("1.2.3.4", t0);
        assert_eq!(limiter.check("1.2.3.4", t0), RateDecision::Allowed);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_prune_drops_idle_clients() {
        let mut limiter = RateLimiter::new(W);
        let t0 = Instant::now();
        limiter.record("idle", t0);
        limiter.record("active", t0 + Duration::from_secs(35));

        let pruned = limiter.prune(t0 + Duration::from_secs(40), W * 4);
        assert_eq!(pruned, 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(
            limiter.check("active", t0 + Duration::from_secs(40)),
            RateDecision::Denied { retry_after_secs: 5 }
        );
    }
}
