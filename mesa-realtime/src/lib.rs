// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Realtime channel multiplexer for Mesa+.
//!
//! Many dashboard views listen to the same realtime channel (orders, tables,
//! stock). [`Multiplexer`] opens the underlying [`Transport`] channel once,
//! fans every event out to all registered callbacks, optionally debounces
//! each callback on its own, and closes the channel when the last
//! [`Subscription`] is released.

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]

#[macro_use]
mod logging;

mod debounce;
pub mod multiplexer;
mod options;
mod subscription;
mod transport;

pub use debounce::{DebouncePhase, DebounceSlot};
pub use multiplexer::Multiplexer;
pub use options::{MultiplexerConfig, SubscribeOptions, DEFAULT_DEBOUNCE_DELAY};
pub use subscription::{Subscription, SubscriptionId};
pub use transport::{EventHandler, Transport};
