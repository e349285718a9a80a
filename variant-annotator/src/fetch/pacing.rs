use std::time::Duration;

/// Pause inserted between consecutive batches of one fetch.
///
/// - delay: base pause, zero means no pause at all
/// - randomize: when set, each pause is `delay + U[0, 1) * delay`, so request timing does not
///   look mechanical to crawler detection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pacing {
    pub delay: Duration,
    pub randomize: bool,
}

impl Pacing {
    pub const fn none() -> Self {
        Self {
            delay: Duration::ZERO,
            randomize: false,
        }
    }

    pub const fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            randomize: false,
        }
    }

    pub const fn randomized(delay: Duration) -> Self {
        Self {
            delay,
            randomize: true,
        }
    }

    /// Same randomization, different base delay. Used for per-call overrides.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    pub fn next_delay(&self) -> Duration {
        if self.randomize && !self.delay.is_zero() {
            self.delay + self.delay.mul_f64(rand::random::<f64>())
        } else {
            self.delay
        }
    }
}
