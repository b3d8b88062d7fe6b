// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Background task handle with cooperative cancellation.

use crate::{CancellationToken, MesaError, Result};
use core::future::Future;
use tokio::runtime::Handle;

/// Spawned task that is cancelled when the handle is dropped.
///
/// The spawned future receives a [`CancellationToken`] and is expected to
/// race its work against [`CancellationToken::cancelled`].
///
/// ```rust
/// use mesa_core::MesaTask;
///
/// # #[tokio::main]
/// # async fn main() {
/// let task = MesaTask::spawn(|cancel| async move {
///     cancel.cancelled().await;
/// })
/// .unwrap();
///
/// task.cancel();
/// assert!(task.is_cancelled());
/// # }
/// ```
#[derive(Debug)]
pub struct MesaTask {
    cancel: CancellationToken,
}

impl MesaTask {
    /// Spawn on the Tokio runtime the caller is running in.
    ///
    /// # Errors
    /// Returns `MesaError::NoRuntime` when called outside a Tokio runtime.
    pub fn spawn<F, Fut>(f: F) -> Result<Self>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|e| MesaError::no_runtime(e.to_string()))?;
        Ok(Self::spawn_on(&handle, f))
    }

    /// Spawn on an explicit runtime handle.
    pub fn spawn_on<F, Fut>(handle: &Handle, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        handle.spawn(f(cancel.clone()));
        Self { cancel }
    }

    /// Signal the task to stop. Does not wait for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once `cancel()` has been called or the handle dropped.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for MesaTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
