// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use mesa_core::ChannelKey;
use std::sync::Weak;

/// Identity of one registration: its channel plus a per-multiplexer
/// sequence number that is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    channel: ChannelKey,
    seq: u64,
}

impl SubscriptionId {
    pub(crate) const fn new(channel: ChannelKey, seq: u64) -> Self {
        Self { channel, seq }
    }

    pub const fn channel(&self) -> &ChannelKey {
        &self.channel
    }

    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.channel, self.seq)
    }
}

/// Registry side of a [`Subscription`], erased over transport and timer types.
pub(crate) trait Unregister: Send + Sync {
    fn unregister(&self, id: &SubscriptionId);
}

/// Deregistration handle returned by `Multiplexer::subscribe`.
///
/// [`unsubscribe`](Self::unsubscribe) is idempotent and safe to call from
/// inside the callback itself. Dropping the handle unsubscribes too; use
/// [`detach`](Self::detach) to keep a registration for the multiplexer's
/// whole lifetime.
#[must_use = "dropping a Subscription unsubscribes the callback"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<dyn Unregister>,
    released: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, registry: Weak<dyn Unregister>) -> Self {
        Self {
            id,
            registry,
            released: AtomicBool::new(false),
        }
    }

    pub const fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Remove the callback; closes the transport channel if it was the last one.
    ///
    /// Any pending debounced delivery for this registration is discarded.
    /// Calls after the first, and calls after the multiplexer is gone, do nothing.
    pub fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.id);
        }
    }

    /// `true` while this handle still owns a live registration.
    pub fn is_active(&self) -> bool {
        !self.released.load(Ordering::Acquire) && self.registry.strong_count() > 0
    }

    /// Give up the handle without unsubscribing.
    pub fn detach(self) {
        self.released.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("released", &self.released.load(Ordering::Relaxed))
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
