// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use mesa_core::{ChannelKey, Result};
use std::sync::Arc;

/// Handler the multiplexer installs on each transport channel.
pub type EventHandler<E> = Arc<dyn Fn(E) + Send + Sync>;

/// External realtime client (websocket, SSE, in-process bus).
///
/// The multiplexer calls both methods while holding its registry lock, so an
/// implementation must not call back into the multiplexer from inside
/// `subscribe` or `unsubscribe`. Delivering events from another task or
/// thread, or later from the same one, is fine.
pub trait Transport: Send + Sync + 'static {
    /// Message type pushed on a channel.
    type Event: Clone + Send + Sync + 'static;

    /// Handle that closes one channel subscription.
    type Subscription: Send + 'static;

    /// Start delivering `channel` events to `handler`.
    ///
    /// # Errors
    /// Any error is returned unchanged from `Multiplexer::subscribe`.
    fn subscribe(
        &self,
        channel: &ChannelKey,
        handler: EventHandler<Self::Event>,
    ) -> Result<Self::Subscription>;

    /// Stop a subscription previously returned by `subscribe`.
    fn unsubscribe(&self, subscription: Self::Subscription);
}
