// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use mesa_core::{ChannelKey, MesaError, RealtimeEvent, Result};
use mesa_realtime::{EventHandler, Transport};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Handle returned by [`MockTransport::subscribe`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockSubscription {
    pub channel: ChannelKey,
    pub id: u64,
}

struct MockState<E> {
    next_id: u64,
    handlers: BTreeMap<u64, (ChannelKey, EventHandler<E>)>,
    subscribe_calls: HashMap<ChannelKey, usize>,
    unsubscribe_calls: HashMap<ChannelKey, usize>,
    failing: HashSet<ChannelKey>,
}

/// In-process transport that records every open and close.
///
/// Clones share state, so keep one clone in the test and hand the other to
/// the multiplexer.
pub struct MockTransport<E = RealtimeEvent> {
    state: Arc<Mutex<MockState<E>>>,
}

impl<E: Clone + Send + Sync + 'static> MockTransport<E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_id: 1,
                handlers: BTreeMap::new(),
                subscribe_calls: HashMap::new(),
                unsubscribe_calls: HashMap::new(),
                failing: HashSet::new(),
            })),
        }
    }

    /// Make every future `subscribe` to `channel` fail.
    pub fn fail_on(&self, channel: &ChannelKey) {
        self.state.lock().failing.insert(channel.clone());
    }

    pub fn recover(&self, channel: &ChannelKey) {
        self.state.lock().failing.remove(channel);
    }

    /// Deliver `event` to every live handler on `channel`, in subscription
    /// order. Returns the number of handlers reached.
    pub fn emit(&self, channel: &ChannelKey, event: E) -> usize {
        let handlers: Vec<EventHandler<E>> = {
            let state = self.state.lock();
            state
                .handlers
                .values()
                .filter(|(key, _)| key == channel)
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };
        for handler in &handlers {
            handler(event.clone());
        }
        handlers.len()
    }

    pub fn subscribe_calls(&self, channel: &ChannelKey) -> usize {
        self.state
            .lock()
            .subscribe_calls
            .get(channel)
            .copied()
            .unwrap_or(0)
    }

    pub fn unsubscribe_calls(&self, channel: &ChannelKey) -> usize {
        self.state
            .lock()
            .unsubscribe_calls
            .get(channel)
            .copied()
            .unwrap_or(0)
    }

    /// Open subscriptions on `channel`.
    pub fn live_subscriptions(&self, channel: &ChannelKey) -> usize {
        self.state
            .lock()
            .handlers
            .values()
            .filter(|(key, _)| key == channel)
            .count()
    }

    pub fn total_live_subscriptions(&self) -> usize {
        self.state.lock().handlers.len()
    }
}

impl<E: Clone + Send + Sync + 'static> Default for MockTransport<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for MockTransport<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: Clone + Send + Sync + 'static> Transport for MockTransport<E> {
    type Event = E;
    type Subscription = MockSubscription;

    fn subscribe(
        &self,
        channel: &ChannelKey,
        handler: EventHandler<E>,
    ) -> Result<MockSubscription> {
        let mut state = self.state.lock();
        *state.subscribe_calls.entry(channel.clone()).or_default() += 1;
        if state.failing.contains(channel) {
            return Err(MesaError::transport(channel.as_str(), "mock transport refused"));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.handlers.insert(id, (channel.clone(), handler));
        Ok(MockSubscription {
            channel: channel.clone(),
            id,
        })
    }

    fn unsubscribe(&self, subscription: MockSubscription) {
        let mut state = self.state.lock();
        *state
            .unsubscribe_calls
            .entry(subscription.channel.clone())
            .or_default() += 1;
        state.handlers.remove(&subscription.id);
    }
}
