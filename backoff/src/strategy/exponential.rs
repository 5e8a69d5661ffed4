use std::time::Duration;

use rand::Rng;

/// An Exponential backoff that multiplies the delay after every attempt.
///
/// After each yielded delay the next one is computed as
/// `delay * (factor + r)` where `r` is drawn uniformly from `[0, jitter)`, and the result is
/// capped at `max_interval`. Because `factor >= 1` and `r >= 0`, consecutive delays never shrink.
///
/// # Example
/// ```
/// use backoff::strategy::exponential::Exponential;
/// use std::time::Duration;
///
/// let mut backoff = Exponential::new(
///     Duration::from_millis(100), // initial interval
///     Duration::from_secs(30),    // max interval
///     2.0,                        // factor
///     0.0,                        // jitter
///     None,                       // retry forever
/// );
///
/// assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(200)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(400)));
/// ```
#[derive(Debug, Clone)]
pub struct Exponential {
    initial_interval: Duration,
    max_interval: Duration,
    factor: f64,
    /// Upper bound (exclusive) of the random amount added to `factor` on every step.
    jitter: f64,
    /// None retries indefinitely.
    max_attempts: Option<u16>,
    next_interval: Duration,
    current_attempt: u16,
}

impl Exponential {
    /// Creates a new Exponential backoff. A `factor` below 1.0 is raised to 1.0 and a negative
    /// `jitter` is treated as no jitter, so the sequence stays non-decreasing.
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        factor: f64,
        jitter: f64,
        max_attempts: Option<u16>,
    ) -> Self {
        let initial_interval = initial_interval.min(max_interval);
        Self {
            initial_interval,
            max_interval,
            factor: factor.max(1.0),
            jitter: jitter.max(0.0),
            max_attempts,
            next_interval: initial_interval,
            current_attempt: 0,
        }
    }

    pub fn from_millis(
        initial_interval_ms: u64,
        max_interval_ms: u64,
        factor: f64,
        jitter: f64,
        max_attempts: Option<u16>,
    ) -> Self {
        Self::new(
            Duration::from_millis(initial_interval_ms),
            Duration::from_millis(max_interval_ms),
            factor,
            jitter,
            max_attempts,
        )
    }

    /// Starts over from the initial interval.
    pub fn reset(&mut self) {
        self.next_interval = self.initial_interval;
        self.current_attempt = 0;
    }

    /// Number of delays handed out since creation or the last [`Exponential::reset`].
    pub fn current_attempt(&self) -> u16 {
        self.current_attempt
    }

    fn grow(&self, interval: Duration) -> Duration {
        let multiplier = if self.jitter == 0.0 {
            self.factor
        } else {
            self.factor + rand::rng().random_range(0.0..self.jitter)
        };

        // compare in f64 before converting back, from_secs_f64 panics on overflow.
        let grown = interval.as_secs_f64() * multiplier;
        if grown >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(grown)
        }
    }
}

impl Iterator for Exponential {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(max_attempts) = self.max_attempts
            && self.current_attempt >= max_attempts
        {
            return None;
        }

        self.current_attempt = self.current_attempt.saturating_add(1);
        let delay = self.next_interval;
        self.next_interval = self.grow(delay);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_parameters() {
        let backoff = Exponential::new(
            Duration::from_secs(60),
            Duration::from_secs(10),
            0.5,
            -1.0,
            Some(5),
        );
        assert_eq!(backoff.initial_interval, Duration::from_secs(10));
        assert_eq!(backoff.factor, 1.0);
        assert_eq!(backoff.jitter, 0.0);
        assert_eq!(backoff.max_attempts, Some(5));
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let mut backoff = Exponential::from_millis(100, 10_000, 2.0, 0.0, None);

        assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next(), Some(Duration::from_millis(800)));
    }

    #[test]
    fn test_max_interval_cap() {
        let mut backoff = Exponential::from_millis(100, 300, 2.0, 0.0, None);

        assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next(), Some(Duration::from_millis(300)));
        assert_eq!(backoff.next(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_max_attempts() {
        let mut backoff = Exponential::from_millis(100, 10_000, 2.0, 0.0, Some(3));

        assert!(backoff.next().is_some());
        assert!(backoff.next().is_some());
        assert!(backoff.next().is_some());
        assert_eq!(backoff.next(), None);
        assert_eq!(backoff.current_attempt(), 3);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Exponential::from_millis(100, 10_000, 2.0, 0.0, Some(2));

        assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next(), None);

        backoff.reset();

        assert_eq!(backoff.current_attempt(), 0);
        assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_jitter_bounds() {
        let mut backoff = Exponential::from_millis(100, 10_000, 2.0, 0.2, None);

        // the first delay is the initial interval, jitter only affects growth
        assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
        let second = backoff.next().unwrap();
        assert!(second >= Duration::from_millis(200));
        assert!(second < Duration::from_millis(220));
    }

    #[test]
    fn test_delays_never_decrease_with_jitter() {
        let backoff = Exponential::from_millis(10, 60_000, 2.0, 0.5, Some(20));
        let delays: Vec<_> = backoff.collect();

        assert_eq!(delays.len(), 20);
        for pair in delays.windows(2) {
            assert!(pair[0] <= pair[1], "{:?} > {:?}", pair[0], pair[1]);
        }
        assert_eq!(delays.last(), Some(&Duration::from_secs(60)));
    }
}
