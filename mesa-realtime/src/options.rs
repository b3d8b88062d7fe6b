// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Debounce delay applied when none is given.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Per-registration delivery options.
///
/// Debouncing is on by default: a burst of events reaches the callback once,
/// `debounce_delay` after the last event of the burst, carrying that last
/// event.
///
/// Debounce timers run on Tokio. Subscribing with `debounce` set fails with
/// `MesaError::NoRuntime` when no runtime is reachable; use
/// [`immediate`](Self::immediate) there or give the multiplexer a runtime.
///
/// ```
/// use mesa_realtime::SubscribeOptions;
/// use std::time::Duration;
///
/// let options = SubscribeOptions::default();
/// assert!(options.debounce);
/// assert_eq!(options.debounce_delay, Duration::from_millis(500));
///
/// assert!(!SubscribeOptions::immediate().debounce);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeOptions {
    pub debounce: bool,
    #[serde(rename = "debounce_delay_ms", with = "mesa_core::duration_ms")]
    pub debounce_delay: Duration,
}

impl SubscribeOptions {
    /// Deliver every event synchronously, in transport order.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            debounce: false,
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
        }
    }

    /// Debounce with the given delay.
    #[must_use]
    pub const fn debounced(delay: Duration) -> Self {
        Self {
            debounce: true,
            debounce_delay: delay,
        }
    }

    #[must_use]
    pub const fn with_debounce(mut self, debounce: bool) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self::debounced(DEFAULT_DEBOUNCE_DELAY)
    }
}

/// Multiplexer-wide settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplexerConfig {
    /// Upper bound on simultaneously open channels; `None` is unbounded.
    pub max_channels: Option<usize>,
}

impl MultiplexerConfig {
    #[must_use]
    pub const fn with_max_channels(mut self, max_channels: usize) -> Self {
        self.max_channels = Some(max_channels);
        self
    }
}
