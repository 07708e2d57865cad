//! Randomized startup delay.
//!
//! Spreads production runs away from the exact scheduler tick. The delay
//! always completes before the fetch starts.

use std::time::Duration;

use rand::Rng;

use crate::models::{DelayConfig, ExecutionMode};

/// Bounded random pause taken before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupDelay {
    min_ms: u64,
    max_ms: u64,
    enabled: bool,
}

impl StartupDelay {
    /// Enabled in production only.
    pub fn for_mode(config: &DelayConfig, mode: ExecutionMode) -> Self {
        Self {
            min_ms: config.min_ms.min(config.max_ms),
            max_ms: config.max_ms,
            enabled: mode.is_production(),
        }
    }

    /// A delay that never sleeps.
    pub fn disabled() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Draw a duration in `[min_ms, max_ms]`, `None` when disabled.
    pub fn pick(&self) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Some(Duration::from_millis(ms))
    }

    /// Sleep for a random duration; returns how long was slept.
    pub async fn wait(&self) -> Duration {
        match self.pick() {
            Some(delay) => {
                log::info!("Delaying start by {} ms", delay.as_millis());
                tokio::time::sleep(delay).await;
                delay
            }
            None => Duration::ZERO,
        }
    }
}
