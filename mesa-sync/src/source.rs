// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Refetching topic state from the source of truth.

use async_trait::async_trait;
use core::fmt;
use core::future::Future;
use mesa_core::{DocumentQuery, MesaError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Query-based document listing API of the authoritative store.
#[async_trait]
pub trait DocumentSource: Send + Sync + 'static {
    /// List the documents of `query.collection` matching `query`.
    async fn list_documents(&self, query: &DocumentQuery) -> Result<Vec<Value>>;
}

#[async_trait]
impl<S: DocumentSource + ?Sized> DocumentSource for Arc<S> {
    async fn list_documents(&self, query: &DocumentQuery) -> Result<Vec<Value>> {
        (**self).list_documents(query).await
    }
}

/// Full state refetch for a named topic.
#[async_trait]
pub trait Resync: Send + Sync + 'static {
    async fn resync(&self, topic: &str) -> Result<()>;
}

#[async_trait]
impl<R: Resync + ?Sized> Resync for Arc<R> {
    async fn resync(&self, topic: &str) -> Result<()> {
        (**self).resync(topic).await
    }
}

/// [`Resync`] backed by an async closure.
///
/// ```
/// use mesa_sync::{Resync, ResyncFn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> mesa_core::Result<()> {
/// let resync = ResyncFn::new(|topic: String| async move {
///     assert_eq!(topic, "orders");
///     Ok(())
/// });
/// resync.resync("orders").await?;
/// # Ok(())
/// # }
/// ```
pub struct ResyncFn<F> {
    f: F,
}

impl<F, Fut> ResyncFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Resync for ResyncFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn resync(&self, topic: &str) -> Result<()> {
        (self.f)(topic.to_string()).await
    }
}

/// What a consumer shows when a refetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the previously delivered documents in place.
    #[default]
    KeepLastKnown,
    /// Deliver an empty list.
    ResetToDefault,
}

/// Receiver of refetched documents.
pub type DocumentSink = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

#[derive(Clone)]
struct Binding {
    query: DocumentQuery,
    policy: FailurePolicy,
    sink: DocumentSink,
}

impl Binding {
    fn deliver(&self, topic: &str, documents: Vec<Value>) -> Result<()> {
        let sink = &self.sink;
        catch_unwind(AssertUnwindSafe(|| sink(documents)))
            .map_err(|_| MesaError::callback_panic(format!("document sink for {topic}")))
    }
}

/// Resyncs each topic by running its bound [`DocumentQuery`] against a
/// [`DocumentSource`] and handing the documents to the topic's sink.
pub struct QueryResync<S> {
    source: S,
    bindings: Mutex<HashMap<String, Binding>>,
}

impl<S: DocumentSource> QueryResync<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// Route resyncs of `topic` through `query` into `sink`.
    ///
    /// Rebinding a topic replaces its query, policy and sink.
    pub fn bind<F>(&self, topic: impl Into<String>, query: DocumentQuery, policy: FailurePolicy, sink: F)
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        self.bindings.lock().insert(
            topic.into(),
            Binding {
                query,
                policy,
                sink: Arc::new(sink),
            },
        );
    }

    pub fn unbind(&self, topic: &str) -> bool {
        self.bindings.lock().remove(topic).is_some()
    }

    pub fn is_bound(&self, topic: &str) -> bool {
        self.bindings.lock().contains_key(topic)
    }

    pub fn query(&self, topic: &str) -> Option<DocumentQuery> {
        self.bindings.lock().get(topic).map(|binding| binding.query.clone())
    }

    pub const fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: DocumentSource> Resync for QueryResync<S> {
    /// # Errors
    /// - `MesaError::UnknownTopic` if nothing is bound to `topic`
    /// - `MesaError::CallbackPanic` if the sink panicked
    /// - `MesaError::Resync` if the source fails; the sink has already been
    ///   handled according to the topic's [`FailurePolicy`]
    async fn resync(&self, topic: &str) -> Result<()> {
        let binding = self
            .bindings
            .lock()
            .get(topic)
            .cloned()
            .ok_or_else(|| MesaError::unknown_topic(topic))?;

        match self.source.list_documents(&binding.query).await {
            Ok(documents) => binding.deliver(topic, documents),
            Err(err) => {
                if binding.policy == FailurePolicy::ResetToDefault {
                    warn!("resync of {topic} failed, resetting: {err}");
                    if let Err(panicked) = binding.deliver(topic, Vec::new()) {
                        warn!("{panicked}");
                    }
                }
                Err(MesaError::resync(topic, err.to_string()))
            }
        }
    }
}

impl<S> fmt::Debug for QueryResync<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.lock();
        let mut topics: Vec<&String> = bindings.keys().collect();
        topics.sort();
        f.debug_struct("QueryResync").field("topics", &topics).finish()
    }
}
