// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use mesa_core::{DocumentQuery, MesaError, Result};
use mesa_sync::DocumentSource;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory document store that evaluates queries with [`DocumentQuery::apply`].
#[derive(Clone, Default)]
pub struct MockDocumentSource {
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    offline: Arc<AtomicBool>,
    queries: Arc<Mutex<Vec<DocumentQuery>>>,
}

impl MockDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of `collection`.
    pub fn set_collection(&self, collection: &str, documents: Vec<Value>) {
        self.collections
            .lock()
            .insert(collection.to_string(), documents);
    }

    pub fn push_document(&self, collection: &str, document: Value) {
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// While offline every listing fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of listings requested so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn fetches_of(&self, collection: &str) -> usize {
        self.queries
            .lock()
            .iter()
            .filter(|q| q.collection == collection)
            .count()
    }

    pub fn last_query(&self) -> Option<DocumentQuery> {
        self.queries.lock().last().cloned()
    }
}

#[async_trait]
impl DocumentSource for MockDocumentSource {
    async fn list_documents(&self, query: &DocumentQuery) -> Result<Vec<Value>> {
        self.queries.lock().push(query.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(MesaError::source(io::Error::other("mock source offline")));
        }
        let documents = self
            .collections
            .lock()
            .get(&query.collection)
            .cloned()
            .unwrap_or_default();
        Ok(query.apply(documents))
    }
}
