// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Runtime seam for everything time-driven in Mesa+.
//!
//! Debounce timers and staleness checks never touch the clock directly; they
//! go through a [`Timer`](timer::Timer) so tests can drive them with a paused
//! Tokio clock instead of waiting on the wall clock.

pub mod impls;
pub mod timer;

#[cfg(feature = "runtime-tokio")]
pub use impls::tokio::TokioTimer;
pub use timer::Timer;

/// The timer used when none is named explicitly.
#[cfg(feature = "runtime-tokio")]
pub type DefaultTimer = TokioTimer;
