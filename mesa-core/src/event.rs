// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Realtime event payloads as delivered by the transport.
//!
//! A message carries the list of dotted event names it matched, for example
//! `databases.main.collections.orders.documents.6650.update`, and the
//! document that changed. The operation is the last segment of the name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operation reported by a realtime event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Update,
    Delete,
    /// Any other suffix, kept verbatim.
    Other(String),
}

impl EventKind {
    /// Classify a dotted event name by its last segment.
    pub fn from_event_name(name: &str) -> Self {
        match name.rsplit('.').next().unwrap_or(name) {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_document_change(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// One message pushed by the realtime transport.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RealtimeEvent {
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl RealtimeEvent {
    pub fn new(events: Vec<String>, payload: Map<String, Value>) -> Self {
        Self { events, payload }
    }

    /// First create/update/delete found among the event names, else the
    /// suffix of the first name. `None` for a message with no names.
    pub fn kind(&self) -> Option<EventKind> {
        let mut fallback = None;
        for name in &self.events {
            let kind = EventKind::from_event_name(name);
            if kind.is_document_change() {
                return Some(kind);
            }
            fallback.get_or_insert(kind);
        }
        fallback
    }

    /// `true` if any event name ends with the given operation.
    pub fn has_kind(&self, kind: &EventKind) -> bool {
        self.events
            .iter()
            .any(|name| &EventKind::from_event_name(name) == kind)
    }

    /// The `$id` field of the payload document.
    pub fn document_id(&self) -> Option<&str> {
        self.payload.get("$id").and_then(Value::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}
