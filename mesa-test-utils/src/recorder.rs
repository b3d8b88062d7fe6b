// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Collects callback invocations together with the time they happened.
///
/// Times are read from `tokio::time::Instant`, so under a paused clock they
/// are exact offsets from [`CallRecorder::new`].
pub struct CallRecorder<E> {
    origin: Instant,
    calls: Arc<Mutex<Vec<(Duration, E)>>>,
}

impl<E: Clone + Send + 'static> CallRecorder<E> {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Callback that appends each event to this recorder.
    pub fn callback(&self) -> impl Fn(E) + Send + Sync + 'static {
        let origin = self.origin;
        let calls = Arc::clone(&self.calls);
        move |event| {
            calls.lock().push((origin.elapsed(), event));
        }
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn values(&self) -> Vec<E> {
        self.calls.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn last(&self) -> Option<E> {
        self.calls.lock().last().map(|(_, e)| e.clone())
    }

    /// Offsets from the recorder's creation at which calls happened.
    pub fn times(&self) -> Vec<Duration> {
        self.calls.lock().iter().map(|(at, _)| *at).collect()
    }

    pub fn calls(&self) -> Vec<(Duration, E)> {
        self.calls.lock().clone()
    }
}

impl<E: Clone + Send + 'static> Default for CallRecorder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for CallRecorder<E> {
    fn clone(&self) -> Self {
        Self {
            origin: self.origin,
            calls: Arc::clone(&self.calls),
        }
    }
}
