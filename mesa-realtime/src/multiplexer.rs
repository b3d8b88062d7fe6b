// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Reference-counted fan-out of transport channels to local callbacks.
//!
//! ## Characteristics
//!
//! - **One transport subscription per channel**: opened by the first
//!   `subscribe` for a key, closed when the last registration for it goes away.
//! - **Late registrations included**: the transport handler looks up the
//!   callbacks at delivery time, so registering never re-subscribes.
//! - **Independent debounce**: each debounced registration coalesces bursts on
//!   its own timer; immediate registrations on the same channel see every event.
//! - **Contained failures**: a panicking callback is logged and skipped; the
//!   other callbacks, the transport subscription and the registry are unaffected.
//!
//! ## Example
//!
//! ```
//! use mesa_core::ChannelKey;
//! use mesa_realtime::{Multiplexer, SubscribeOptions};
//! use mesa_test_utils::MockTransport;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> mesa_core::Result<()> {
//! let transport = MockTransport::<u32>::new();
//! let mux = Multiplexer::new(transport.clone());
//! let orders = ChannelKey::new("orders")?;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//! let first = mux.subscribe(&orders, move |_| { counter.fetch_add(1, Ordering::SeqCst); }, SubscribeOptions::immediate())?;
//! let second = mux.subscribe(&orders, |_| {}, SubscribeOptions::immediate())?;
//! assert_eq!(transport.subscribe_calls(&orders), 1);
//!
//! transport.emit(&orders, 7);
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//!
//! first.unsubscribe();
//! second.unsubscribe();
//! assert_eq!(transport.unsubscribe_calls(&orders), 1);
//! # Ok(())
//! # }
//! ```

use crate::debounce::DebounceSlot;
use crate::options::{MultiplexerConfig, SubscribeOptions};
use crate::subscription::{Subscription, SubscriptionId, Unregister};
use crate::transport::{EventHandler, Transport};
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use futures::future::{select, Either};
use mesa_core::{ChannelKey, MesaError, MesaTask, Result};
use mesa_runtime::{DefaultTimer, Timer};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;

type Callback<E> = Arc<dyn Fn(E) + Send + Sync>;

struct DebounceDriver<E> {
    slot: DebounceSlot<E>,
    // Replacing or dropping the task cancels its timer
    timer_task: Option<MesaTask>,
}

struct CallbackEntry<E> {
    id: SubscriptionId,
    callback: Callback<E>,
    options: SubscribeOptions,
    active: AtomicBool,
    debounce: Mutex<DebounceDriver<E>>,
}

impl<E> CallbackEntry<E> {
    fn new(id: SubscriptionId, callback: Callback<E>, options: SubscribeOptions) -> Self {
        Self {
            id,
            callback,
            options,
            active: AtomicBool::new(true),
            debounce: Mutex::new(DebounceDriver {
                slot: DebounceSlot::new(),
                timer_task: None,
            }),
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        let mut driver = self.debounce.lock();
        driver.slot.cancel();
        if let Some(task) = driver.timer_task.take() {
            task.cancel();
        }
    }

    fn invoke(&self, event: E) {
        if !self.is_active() {
            return;
        }
        let callback = &self.callback;
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
            let err = MesaError::callback_panic(format!(
                "{}: {}",
                self.id,
                panic_message(panic.as_ref())
            ));
            error!("{err}");
        }
    }

    fn fire(&self, generation: u64) {
        let pending = {
            let mut driver = self.debounce.lock();
            let pending = driver.slot.elapse(generation);
            if pending.is_some() {
                driver.timer_task = None;
            }
            pending
        };
        if let Some(event) = pending {
            self.invoke(event);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct ChannelState<S, E> {
    subscription: S,
    entries: BTreeMap<u64, Arc<CallbackEntry<E>>>,
}

struct Registry<S, E> {
    closed: bool,
    channels: HashMap<ChannelKey, ChannelState<S, E>>,
}

struct Inner<T: Transport, TM: Timer> {
    transport: T,
    timer: TM,
    config: MultiplexerConfig,
    // Set through `set_runtime`; wins over everything else
    runtime: Mutex<Option<Handle>>,
    // Runtime current at construction; last resort for foreign threads
    ambient: Option<Handle>,
    next_seq: AtomicU64,
    registry: Mutex<Registry<T::Subscription, T::Event>>,
}

impl<T: Transport, TM: Timer> Inner<T, TM> {
    fn register(
        self: &Arc<Self>,
        channel: &ChannelKey,
        callback: Callback<T::Event>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionId> {
        if options.debounce && self.runtime_handle().is_none() {
            return Err(MesaError::no_runtime(format!(
                "debounced subscription on {channel}"
            )));
        }

        let id = SubscriptionId::new(channel.clone(), self.next_seq.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(CallbackEntry::new(id.clone(), callback, options));

        let mut registry = self.registry.lock();
        if registry.closed {
            return Err(MesaError::Closed);
        }

        let open_channels = registry.channels.len();
        let state = match registry.channels.entry(channel.clone()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                if let Some(limit) = self.config.max_channels {
                    if open_channels >= limit {
                        return Err(MesaError::resource_limit("channels", limit));
                    }
                }
                let handler = Self::fan_out(Arc::downgrade(self), channel.clone());
                let subscription = self.transport.subscribe(channel, handler).map_err(|err| {
                    warn!("failed to open transport channel {channel}: {err}");
                    err
                })?;
                debug!("opened transport channel {channel}");
                vacant.insert(ChannelState {
                    subscription,
                    entries: BTreeMap::new(),
                })
            }
        };
        state.entries.insert(id.seq(), entry);
        Ok(id)
    }

    fn fan_out(inner: Weak<Self>, channel: ChannelKey) -> EventHandler<T::Event> {
        Arc::new(move |event| {
            if let Some(inner) = inner.upgrade() {
                inner.dispatch(&channel, event);
            }
        })
    }

    fn dispatch(&self, channel: &ChannelKey, event: T::Event) {
        // Callbacks may (un)subscribe, so never hold the registry while calling them
        let entries: Vec<Arc<CallbackEntry<T::Event>>> = {
            let registry = self.registry.lock();
            match registry.channels.get(channel) {
                Some(state) => state.entries.values().cloned().collect(),
                None => return,
            }
        };

        for entry in entries {
            if !entry.is_active() {
                continue;
            }
            if entry.options.debounce {
                self.schedule(&entry, event.clone());
            } else {
                entry.invoke(event.clone());
            }
        }
    }

    fn runtime_handle(&self) -> Option<Handle> {
        if let Some(handle) = self.runtime.lock().clone() {
            return Some(handle);
        }
        Handle::try_current().ok().or_else(|| self.ambient.clone())
    }

    fn schedule(&self, entry: &Arc<CallbackEntry<T::Event>>, event: T::Event) {
        let Some(handle) = self.runtime_handle() else {
            warn!("no async runtime for debounced delivery on {}; delivering immediately", entry.id);
            entry.invoke(event);
            return;
        };

        // The deadline is fixed now, not when the task is first polled.
        // A runtime built without timers panics here.
        let delay = entry.options.debounce_delay;
        let sleep = match catch_unwind(AssertUnwindSafe(|| {
            let _context = handle.enter();
            self.timer.sleep_future(delay)
        })) {
            Ok(sleep) => sleep,
            Err(panic) => {
                warn!(
                    "timer unavailable for {} ({}); delivering immediately",
                    entry.id,
                    panic_message(panic.as_ref())
                );
                entry.invoke(event);
                return;
            }
        };

        let mut driver = entry.debounce.lock();
        let Some(generation) = driver.slot.arm(event) else {
            return;
        };
        let target = Arc::clone(entry);
        driver.timer_task = Some(MesaTask::spawn_on(&handle, move |cancel| async move {
            let sleep = Box::pin(sleep);
            let cancelled = Box::pin(cancel.cancelled());
            if let Either::Left(_) = select(sleep, cancelled).await {
                target.fire(generation);
            }
        }));
    }

    fn close_all(&self) {
        let mut registry = self.registry.lock();
        registry.closed = true;
        let channels = core::mem::take(&mut registry.channels);
        for (channel, state) in channels {
            for entry in state.entries.values() {
                entry.deactivate();
            }
            self.transport.unsubscribe(state.subscription);
            debug!("closed transport channel {channel}");
        }
    }
}

impl<T: Transport, TM: Timer> Unregister for Inner<T, TM> {
    fn unregister(&self, id: &SubscriptionId) {
        let mut registry = self.registry.lock();
        let Some(state) = registry.channels.get_mut(id.channel()) else {
            return;
        };
        let Some(entry) = state.entries.remove(&id.seq()) else {
            return;
        };
        entry.deactivate();

        if state.entries.is_empty() {
            if let Some(state) = registry.channels.remove(id.channel()) {
                self.transport.unsubscribe(state.subscription);
                debug!("closed transport channel {}", id.channel());
            }
        }
    }
}

impl<T: Transport, TM: Timer> Drop for Inner<T, TM> {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Shares realtime channels between any number of local consumers.
///
/// See the [module documentation](self) for the delivery guarantees.
/// Cheap to clone; clones share the same registry. Dropping the last clone
/// closes every open transport channel.
pub struct Multiplexer<T: Transport, TM: Timer = DefaultTimer> {
    inner: Arc<Inner<T, TM>>,
}

impl<T: Transport> Multiplexer<T> {
    /// Multiplexer over `transport` with the default timer and no channel limit.
    pub fn new(transport: T) -> Self {
        Self::with_timer(transport, DefaultTimer::default(), MultiplexerConfig::default())
    }

    pub fn with_config(transport: T, config: MultiplexerConfig) -> Self {
        Self::with_timer(transport, DefaultTimer::default(), config)
    }
}

impl<T: Transport, TM: Timer> Multiplexer<T, TM> {
    /// Multiplexer with an explicit timer.
    ///
    /// Debounce timers are spawned on the runtime given to
    /// [`set_runtime`](Self::set_runtime), else on the Tokio runtime current
    /// when the event arrives, else on the one current at construction.
    pub fn with_timer(transport: T, timer: TM, config: MultiplexerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                timer,
                config,
                runtime: Mutex::new(None),
                ambient: Handle::try_current().ok(),
                next_seq: AtomicU64::new(1),
                registry: Mutex::new(Registry {
                    closed: false,
                    channels: HashMap::new(),
                }),
            }),
        }
    }

    /// Runtime for every debounce timer, whatever thread events arrive on.
    pub fn set_runtime(&self, handle: Handle) {
        *self.inner.runtime.lock() = Some(handle);
    }

    /// Register `callback` on `channel`.
    ///
    /// Opens the transport channel if this is its first registration. The
    /// returned [`Subscription`] deregisters on `unsubscribe()` or drop.
    ///
    /// # Errors
    /// - `MesaError::Closed` after [`shutdown`](Self::shutdown)
    /// - `MesaError::NoRuntime` for a debounced registration when no Tokio
    ///   runtime is reachable
    /// - `MesaError::ResourceLimitExceeded` if a new channel would exceed `max_channels`
    /// - whatever the transport returns when opening the channel fails; nothing is
    ///   registered in that case
    pub fn subscribe<F>(
        &self,
        channel: &ChannelKey,
        callback: F,
        options: SubscribeOptions,
    ) -> Result<Subscription>
    where
        F: Fn(T::Event) + Send + Sync + 'static,
    {
        let id = self.inner.register(channel, Arc::new(callback), options)?;
        let registry: Weak<dyn Unregister> = Arc::downgrade(&self.inner) as Weak<dyn Unregister>;
        Ok(Subscription::new(id, registry))
    }

    /// Number of channels with an open transport subscription.
    pub fn channel_count(&self) -> usize {
        self.inner.registry.lock().channels.len()
    }

    /// Live registrations on `channel` (its reference count).
    pub fn subscriber_count(&self, channel: &ChannelKey) -> usize {
        self.inner
            .registry
            .lock()
            .channels
            .get(channel)
            .map_or(0, |state| state.entries.len())
    }

    pub fn is_open(&self, channel: &ChannelKey) -> bool {
        self.inner.registry.lock().channels.contains_key(channel)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.registry.lock().closed
    }

    /// Close every channel, discard pending debounced deliveries and refuse
    /// new registrations. Outstanding [`Subscription`]s become no-ops.
    pub fn shutdown(&self) {
        self.inner.close_all();
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn config(&self) -> &MultiplexerConfig {
        &self.inner.config
    }
}

impl<T: Transport, TM: Timer> Clone for Multiplexer<T, TM> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport, TM: Timer> fmt::Debug for Multiplexer<T, TM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("Multiplexer")
            .field("channels", &registry.channels.len())
            .field("closed", &registry.closed)
            .finish()
    }
}
