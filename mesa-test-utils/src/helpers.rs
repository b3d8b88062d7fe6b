// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;
use tokio::time::advance;

/// Let woken timer tasks run before the test continues.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Move the paused clock forward, then [`settle`].
pub async fn advance_and_settle(duration: Duration) {
    advance(duration).await;
    settle().await;
}

/// Shorthand for `Duration::from_millis`.
pub const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
