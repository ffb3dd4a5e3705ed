use std::time::Duration;

/// Configuration for a dialogue engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Honour `autoContinue` on lines. When false, every line waits for `advance`.
    pub auto_continue: bool,
    /// Multiplier applied to every auto-continue delay.
    pub delay_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_continue: true,
            delay_scale: 1.0,
        }
    }
}

impl EngineConfig {
    /// Enable or disable auto-continue.
    pub fn with_auto_continue(mut self, enabled: bool) -> Self {
        self.auto_continue = enabled;
        self
    }

    /// Set the auto-continue delay multiplier.
    pub fn with_delay_scale(mut self, scale: f64) -> Self {
        self.delay_scale = scale;
        self
    }

    /// Apply the delay multiplier. Negative scales clamp to zero; non-finite
    /// scales are ignored.
    pub fn scaled_delay(&self, delay: Duration) -> Duration {
        let scale = if self.delay_scale.is_finite() {
            self.delay_scale.max(0.0)
        } else {
            1.0
        };
        Duration::try_from_secs_f64(delay.as_secs_f64() * scale).unwrap_or(Duration::ZERO)
    }
}
