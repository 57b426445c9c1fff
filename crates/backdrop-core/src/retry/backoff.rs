//! Exponential backoff with jitter.
//!
//! `delay(attempt) = floor(min(base * 2^(attempt-1), max) * (1 + U[0, ratio)))`.
//! The jitter only ever adds time, so a delay never drops below the
//! exponential value and never exceeds `max * (1 + ratio)`.

use rand::Rng;
use std::time::Duration;

/// Backoff schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, jitter_ratio: f64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            jitter_ratio,
        }
    }

    /// Exponential part of the delay before attempt `attempt + 1`.
    ///
    /// `attempt` is 1-based; 0 is treated as 1.
    pub fn exponential_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1);
        let factor = 2u64.checked_pow(exponent).unwrap_or(u64::MAX);
        self.base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
    }

    /// Delay after failed attempt `attempt`, using the thread RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Delay after failed attempt `attempt`, drawing jitter from `rng`.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exp = self.exponential_ms(attempt) as f64;
        let jitter = rng.gen::<f64>() * self.jitter_ratio * exp;
        Duration::from_millis((exp + jitter).floor() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn default_backoff() -> Backoff {
        Backoff::new(5000, 30_000, 0.3)
    }

    #[test]
    fn test_exponential_growth() {
        let backoff = default_backoff();
        assert_eq!(backoff.exponential_ms(1), 5000);
        assert_eq!(backoff.exponential_ms(2), 10_000);
        assert_eq!(backoff.exponential_ms(3), 20_000);
        assert_eq!(backoff.exponential_ms(4), 30_000);
    }

    #[test]
    fn test_exponential_capped_and_saturating() {
        let backoff = default_backoff();
        assert_eq!(backoff.exponential_ms(10), 30_000);
        assert_eq!(backoff.exponential_ms(200), 30_000);
        assert_eq!(backoff.exponential_ms(0), 5000);
    }

    #[test]
    fn test_delay_within_jitter_bounds() {
        let backoff = default_backoff();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=6 {
            let exp = backoff.exponential_ms(attempt);
            let upper = (exp as f64 * 1.3) as u64;
            for _ in 0..200 {
                let delay = backoff.delay_with(attempt, &mut rng).as_millis() as u64;
                assert!(delay >= exp, "attempt {attempt}: {delay} < {exp}");
                assert!(delay <= upper, "attempt {attempt}: {delay} > {upper}");
                assert!(delay <= 39_000);
            }
        }
    }

    #[test]
    fn test_delay_without_jitter_is_exact() {
        let backoff = Backoff::new(100, 1000, 0.0);
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(8), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_actually_varies() {
        let backoff = default_backoff();
        let mut rng = StdRng::seed_from_u64(42);
        let delays: std::collections::HashSet<_> =
            (0..20).map(|_| backoff.delay_with(1, &mut rng)).collect();
        assert!(delays.len() > 1);
    }
}
