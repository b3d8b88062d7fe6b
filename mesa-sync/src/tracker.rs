// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-topic health: when did a topic last hear from the transport?
//!
//! ```text
//!   Inactive ──activate / record_event──▶ Active ◀─┐ record_event, mark_synced
//!      │                                   │  └────┘
//!      └──mark_synced (never active)──────▶│
//!                          stale_topics()  ▼
//!                                   StaleDetected ──mark_synced──▶ Active
//!
//!   any ──deactivate──▶ Inactive
//! ```

use core::fmt;
use core::time::Duration;
use mesa_core::{MesaError, Result};
use mesa_runtime::{DefaultTimer, Timer};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Silence after which a topic is considered stale when no threshold is given.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicState {
    /// Registered but not being displayed; never checked.
    Inactive,
    Active,
    /// Silent for longer than its threshold; waiting for a successful resync.
    StaleDetected,
}

/// Health record of one topic.
#[derive(Debug, Clone, Copy)]
pub struct TopicHealth<I> {
    pub state: TopicState,
    pub last_event: Option<I>,
    pub threshold: Duration,
}

struct Topics<I> {
    topics: BTreeMap<String, TopicHealth<I>>,
}

/// Tracks the last-event time of named topics.
///
/// Cheap to clone; clones share the same table.
///
/// ```
/// use mesa_sync::{StalenessTracker, TopicState};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> mesa_core::Result<()> {
/// let tracker = StalenessTracker::new();
/// tracker.register("orders", Duration::from_secs(60));
/// assert_eq!(tracker.state("orders"), Some(TopicState::Inactive));
///
/// tracker.record_event("orders")?;
/// assert_eq!(tracker.state("orders"), Some(TopicState::Active));
/// assert!(tracker.stale_topics().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct StalenessTracker<TM: Timer = DefaultTimer> {
    timer: TM,
    inner: Arc<Mutex<Topics<TM::Instant>>>,
}

impl StalenessTracker {
    pub fn new() -> Self {
        Self::with_timer(DefaultTimer::default())
    }
}

impl Default for StalenessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl<TM: Timer> StalenessTracker<TM> {
    pub fn with_timer(timer: TM) -> Self {
        Self {
            timer,
            inner: Arc::new(Mutex::new(Topics {
                topics: BTreeMap::new(),
            })),
        }
    }

    /// Add `topic` as [`TopicState::Inactive`].
    ///
    /// Registering a known topic only replaces its threshold.
    pub fn register(&self, topic: impl Into<String>, threshold: Duration) {
        let mut inner = self.inner.lock();
        inner
            .topics
            .entry(topic.into())
            .and_modify(|health| health.threshold = threshold)
            .or_insert(TopicHealth {
                state: TopicState::Inactive,
                last_event: None,
                threshold,
            });
    }

    /// Forget `topic` entirely. Returns `false` if it was not registered.
    pub fn unregister(&self, topic: &str) -> bool {
        self.inner.lock().topics.remove(topic).is_some()
    }

    /// Start tracking after the initial fetch: any state becomes Active and
    /// the silence clock restarts.
    ///
    /// # Errors
    /// `MesaError::UnknownTopic` if `topic` was never registered.
    pub fn activate(&self, topic: &str) -> Result<()> {
        let now = self.timer.now();
        self.update(topic, |health| {
            health.state = TopicState::Active;
            health.last_event = Some(now);
        })
    }

    /// A realtime event arrived for `topic`.
    ///
    /// # Errors
    /// `MesaError::UnknownTopic` if `topic` was never registered.
    pub fn record_event(&self, topic: &str) -> Result<()> {
        self.activate(topic)
    }

    /// The initial fetch or a resync of `topic` succeeded.
    ///
    /// A topic that was never active becomes Active. A topic deactivated
    /// after it was active stays inactive, so a resync finishing after
    /// teardown does not revive it.
    ///
    /// # Errors
    /// `MesaError::UnknownTopic` if `topic` was never registered.
    pub fn mark_synced(&self, topic: &str) -> Result<()> {
        let now = self.timer.now();
        self.update(topic, |health| {
            if health.state != TopicState::Inactive || health.last_event.is_none() {
                health.state = TopicState::Active;
                health.last_event = Some(now);
            }
        })
    }

    /// Stop checking `topic` until it is activated again.
    ///
    /// # Errors
    /// `MesaError::UnknownTopic` if `topic` was never registered.
    pub fn deactivate(&self, topic: &str) -> Result<()> {
        self.update(topic, |health| health.state = TopicState::Inactive)
    }

    /// Topics that need a resync.
    ///
    /// Active topics silent for longer than their threshold move to
    /// [`TopicState::StaleDetected`]. Topics already in that state are
    /// returned again so a failed resync is retried on the next check.
    pub fn stale_topics(&self) -> Vec<String> {
        let now = self.timer.now();
        let mut inner = self.inner.lock();
        let mut stale = Vec::new();
        for (topic, health) in &mut inner.topics {
            match health.state {
                TopicState::Inactive => {}
                TopicState::StaleDetected => stale.push(topic.clone()),
                TopicState::Active => {
                    let silence = health.last_event.map_or(Duration::MAX, |at| since(now, at));
                    if silence > health.threshold {
                        info!("topic {topic} silent for {silence:?}, marking stale");
                        health.state = TopicState::StaleDetected;
                        stale.push(topic.clone());
                    }
                }
            }
        }
        stale
    }

    /// Every topic that is not inactive.
    pub fn active_topics(&self) -> Vec<String> {
        self.inner
            .lock()
            .topics
            .iter()
            .filter(|(_, health)| health.state != TopicState::Inactive)
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    pub fn state(&self, topic: &str) -> Option<TopicState> {
        self.inner.lock().topics.get(topic).map(|health| health.state)
    }

    pub fn health(&self, topic: &str) -> Option<TopicHealth<TM::Instant>> {
        self.inner.lock().topics.get(topic).copied()
    }

    /// Time since `topic` last heard an event or was synced.
    pub fn silence(&self, topic: &str) -> Option<Duration> {
        let last = self.inner.lock().topics.get(topic)?.last_event?;
        Some(self.timer.since(last))
    }

    pub const fn timer(&self) -> &TM {
        &self.timer
    }

    pub fn len(&self) -> usize {
        self.inner.lock().topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().topics.is_empty()
    }

    /// Callback that records an event for `topic` each time it is called.
    ///
    /// Register it on the multiplexer with immediate delivery next to the
    /// consumer's own callback.
    pub fn recorder<E>(&self, topic: impl Into<String>) -> impl Fn(E) + Send + Sync + 'static {
        let tracker = self.clone();
        let topic = topic.into();
        move |_event| {
            if let Err(err) = tracker.record_event(&topic) {
                debug!("dropping event: {err}");
            }
        }
    }

    fn update(&self, topic: &str, f: impl FnOnce(&mut TopicHealth<TM::Instant>)) -> Result<()> {
        let mut inner = self.inner.lock();
        let health = inner
            .topics
            .get_mut(topic)
            .ok_or_else(|| MesaError::unknown_topic(topic))?;
        f(health);
        Ok(())
    }
}

fn since<I>(now: I, earlier: I) -> Duration
where
    I: Ord + core::ops::Sub<I, Output = Duration>,
{
    if now > earlier {
        now - earlier
    } else {
        Duration::ZERO
    }
}

impl<TM: Timer> Clone for StalenessTracker<TM> {
    fn clone(&self) -> Self {
        Self {
            timer: self.timer.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<TM: Timer> fmt::Debug for StalenessTracker<TM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_map()
            .entries(inner.topics.iter().map(|(topic, health)| (topic, health.state)))
            .finish()
    }
}
