use std::time::Duration;

/// Exponential backoff between status polls.
///
/// Attempt `n` waits `base_delay_ms * multiplier^n`, capped at
/// `max_delay_ms`, with up to +/-5% jitter so concurrent pollers spread out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base_delay_ms: f64,
    pub max_delay_ms: f64,
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000.0,
            max_delay_ms: 15_000.0,
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// Delay before poll number `attempt + 1`, without jitter.
    pub fn nominal_ms(&self, attempt: u32) -> f64 {
        // powi saturates to inf for huge exponents; min() brings it back to the cap
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        (self.base_delay_ms * self.multiplier.powi(exponent))
            .min(self.max_delay_ms)
            .max(0.0)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_ms(attempt);
        let jitter = nominal * 0.1 * (rand::random::<f64>() - 0.5);
        let ms = (nominal + jitter).clamp(0.0, self.max_delay_ms.max(0.0));
        Duration::from_millis(ms as u64)
    }
}
