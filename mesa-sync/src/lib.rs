// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Staleness detection and resynchronisation for realtime-fed state.
//!
//! The realtime transport gives no delivery guarantee, so a view that only
//! listens can silently fall behind. This crate compensates:
//!
//! - [`StalenessTracker`] remembers when each topic last heard an event.
//! - [`Resync`] refetches a topic from the source of truth;
//!   [`QueryResync`] does so with a [`DocumentQuery`](mesa_core::DocumentQuery)
//!   against a [`DocumentSource`].
//! - [`Watchdog`] periodically resyncs stale topics, and every topic on a
//!   longer backstop interval.

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]

#[macro_use]
mod logging;

pub mod source;
pub mod tracker;
pub mod watchdog;

pub use source::{DocumentSink, DocumentSource, FailurePolicy, QueryResync, Resync, ResyncFn};
pub use tracker::{StalenessTracker, TopicHealth, TopicState, DEFAULT_STALE_AFTER};
pub use watchdog::{CheckReport, Watchdog, WatchdogConfig};
