// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Trailing-debounce state for a single registration.
//!
//! The slot only tracks *what* would be delivered; the multiplexer owns the
//! timer. Every [`arm`](DebounceSlot::arm) replaces the pending event and
//! bumps a generation counter. When a timer elapses it reports the
//! generation it was started for, and only the timer of the newest
//! generation gets the event:
//!
//! ```text
//!   Idle ──arm──▶ Armed ──elapse(current)──▶ Fired ──arm──▶ Armed ...
//!                  │ ▲
//!                  └─┘ arm (replace pending, new generation)
//!
//!   any ──cancel──▶ Cancelled   (terminal; arm is refused)
//! ```

/// Observable phase of a [`DebounceSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    Idle,
    Armed,
    Fired,
    Cancelled,
}

#[derive(Debug)]
enum State<E> {
    Idle,
    Armed { latest: E, generation: u64 },
    Fired,
    Cancelled,
}

/// Pending-event bookkeeping for one debounced callback.
///
/// ```
/// use mesa_realtime::{DebouncePhase, DebounceSlot};
///
/// let mut slot = DebounceSlot::new();
/// let first = slot.arm("E1").unwrap();
/// let second = slot.arm("E2").unwrap();
///
/// assert_eq!(slot.elapse(first), None);        // superseded timer
/// assert_eq!(slot.elapse(second), Some("E2")); // latest event wins
/// assert_eq!(slot.phase(), DebouncePhase::Fired);
/// ```
#[derive(Debug)]
pub struct DebounceSlot<E> {
    state: State<E>,
    generation: u64,
}

impl<E> DebounceSlot<E> {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            generation: 0,
        }
    }

    /// Store `event` as the pending one and start a new generation.
    ///
    /// Returns the generation the caller's timer must report back to
    /// [`elapse`](Self::elapse), or `None` if the slot was cancelled.
    pub fn arm(&mut self, event: E) -> Option<u64> {
        if matches!(self.state, State::Cancelled) {
            return None;
        }
        self.generation = self.generation.wrapping_add(1);
        self.state = State::Armed {
            latest: event,
            generation: self.generation,
        };
        Some(self.generation)
    }

    /// A timer started for `generation` has elapsed.
    ///
    /// Yields the pending event only if no newer event re-armed the slot
    /// since that timer was started.
    pub fn elapse(&mut self, generation: u64) -> Option<E> {
        let current = matches!(
            self.state,
            State::Armed { generation: armed, .. } if armed == generation
        );
        if !current {
            return None;
        }
        match core::mem::replace(&mut self.state, State::Fired) {
            State::Armed { latest, .. } => Some(latest),
            _ => None,
        }
    }

    /// Drop any pending event and refuse further arming.
    ///
    /// Returns the event that will now never be delivered.
    pub fn cancel(&mut self) -> Option<E> {
        match core::mem::replace(&mut self.state, State::Cancelled) {
            State::Armed { latest, .. } => Some(latest),
            _ => None,
        }
    }

    pub fn phase(&self) -> DebouncePhase {
        match self.state {
            State::Idle => DebouncePhase::Idle,
            State::Armed { .. } => DebouncePhase::Armed,
            State::Fired => DebouncePhase::Fired,
            State::Cancelled => DebouncePhase::Cancelled,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, State::Armed { .. })
    }

    /// Generation of the most recent `arm`.
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

impl<E> Default for DebounceSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}
