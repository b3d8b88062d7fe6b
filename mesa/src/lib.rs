// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Mesa+
//!
//! Realtime plumbing for views that live off a push transport.
//!
//! ## Overview
//!
//! - [`Multiplexer`] shares one transport subscription per channel between
//!   any number of local callbacks, each optionally debounced.
//! - [`StalenessTracker`] and [`Watchdog`] notice topics that went quiet and
//!   refetch them from the source of truth, plus a slower unconditional
//!   backstop refetch.
//!
//! ## Quick Start
//!
//! ```rust
//! use mesa::prelude::*;
//! use mesa_test_utils::MockTransport;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> mesa::Result<()> {
//! let transport = MockTransport::<RealtimeEvent>::new();
//! let mux = Multiplexer::new(transport);
//! let orders = ChannelKey::documents("main", "orders");
//!
//! let tracker = StalenessTracker::new();
//! tracker.register(orders.as_str(), Duration::from_secs(60));
//!
//! let _view = mux.subscribe(&orders, |event: RealtimeEvent| {
//!     println!("order changed: {:?}", event.document_id());
//! }, SubscribeOptions::default())?;
//! let _health = mux.subscribe(&orders, tracker.recorder::<RealtimeEvent>(orders.as_str()), SubscribeOptions::immediate())?;
//! # Ok(())
//! # }
//! ```

pub use mesa_core::{
    CancellationToken, ChannelKey, DocumentQuery, EventKind, MesaTask, Query, RealtimeEvent,
};
pub use mesa_error::{MesaError, Result, ResultExt};
pub use mesa_realtime::{
    DebouncePhase, DebounceSlot, EventHandler, Multiplexer, MultiplexerConfig, SubscribeOptions,
    Subscription, SubscriptionId, Transport, DEFAULT_DEBOUNCE_DELAY,
};
pub use mesa_runtime::{DefaultTimer, Timer, TokioTimer};
pub use mesa_sync::{
    CheckReport, DocumentSink, DocumentSource, FailurePolicy, QueryResync, Resync, ResyncFn,
    StalenessTracker, TopicHealth, TopicState, Watchdog, WatchdogConfig, DEFAULT_STALE_AFTER,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ChannelKey, DocumentQuery, DocumentSource, FailurePolicy, MesaError, Multiplexer,
        QueryResync, RealtimeEvent, Resync, StalenessTracker, SubscribeOptions, Subscription,
        Transport, Watchdog, WatchdogConfig,
    };
}
