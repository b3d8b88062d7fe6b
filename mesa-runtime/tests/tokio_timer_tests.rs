// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use mesa_runtime::{Timer, TokioTimer};
use std::time::Duration;
use tokio::time::{advance, pause};

#[tokio::test]
async fn test_now_follows_paused_clock() {
    pause();
    let timer = TokioTimer;

    let start = timer.now();
    advance(Duration::from_secs(90)).await;

    assert_eq!(timer.since(start), Duration::from_secs(90));
}

#[tokio::test]
async fn test_since_saturates_for_future_instants() {
    pause();
    let timer = TokioTimer;

    let later = timer.now() + Duration::from_secs(5);

    assert_eq!(timer.since(later), Duration::ZERO);
}

#[tokio::test]
async fn test_sleep_future_completes_after_duration() {
    pause();
    let timer = TokioTimer;
    let start = timer.now();

    timer.sleep_future(Duration::from_millis(500)).await;

    assert!(timer.since(start) >= Duration::from_millis(500));
}
