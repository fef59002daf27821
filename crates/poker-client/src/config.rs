use rand::Rng;
use std::time::Duration;

/// Backoff policy for re-establishing a dropped event stream.
///
/// Retries never stop: the stream is the only path to freshness, so the
/// connector keeps trying for as long as the consumer holds it open.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the exponential schedule.
    pub max_delay: Duration,
    /// Fraction of the delay that is randomized, in `0.0..=1.0`.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            jitter: 0.5,
        }
    }
}

impl ReconnectConfig {
    /// Delay before retry number `attempt` (zero-based), jittered so that a
    /// fleet of clients does not stampede the service after an outage.
    pub fn delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let exp = attempt.min(16);
        let base = self
            .initial_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return base;
        }
        let fixed = base.mul_f64(1.0 - jitter);
        let spread = base.mul_f64(jitter * rng.gen::<f64>());
        fixed + spread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn schedule_doubles_and_caps() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(config.delay(0, &mut rng), Duration::from_millis(100));
        assert_eq!(config.delay(1, &mut rng), Duration::from_millis(200));
        assert_eq!(config.delay(2, &mut rng), Duration::from_millis(400));
        assert_eq!(config.delay(10, &mut rng), Duration::from_secs(1));
        // Large attempt counts must not overflow the shift.
        assert_eq!(config.delay(u32::MAX, &mut rng), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: 0.5,
        };
        let mut rng = StdRng::seed_from_u64(42);
        for attempt in 0..8 {
            let base = Duration::from_millis(100).saturating_mul(1 << attempt);
            let delay = config.delay(attempt, &mut rng);
            assert!(delay >= base.mul_f64(0.5), "attempt {attempt}: {delay:?}");
            assert!(delay <= base, "attempt {attempt}: {delay:?}");
        }
    }
}
