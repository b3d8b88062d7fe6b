// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Realtime fixtures shaped like the restaurant dashboard's traffic.

use mesa_core::{ChannelKey, RealtimeEvent};
use serde_json::{json, Map, Value};

pub const DATABASE: &str = "mesa";

pub fn orders_channel() -> ChannelKey {
    ChannelKey::documents(DATABASE, "orders")
}

pub fn tables_channel() -> ChannelKey {
    ChannelKey::documents(DATABASE, "tables")
}

pub fn stock_channel() -> ChannelKey {
    ChannelKey::documents(DATABASE, "stock")
}

/// Event for `document` in `collection` with the given operation suffix.
pub fn document_event(collection: &str, operation: &str, document: Value) -> RealtimeEvent {
    let id = document
        .get("$id")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let payload = match document {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    RealtimeEvent::new(
        vec![
            format!("databases.{DATABASE}.collections.{collection}.documents.{id}.{operation}"),
            format!("databases.*.collections.*.documents.*.{operation}"),
        ],
        payload,
    )
}

pub fn order_created(id: &str, table: u32) -> RealtimeEvent {
    document_event(
        "orders",
        "create",
        json!({"$id": id, "table": table, "status": "open"}),
    )
}

pub fn order_updated(id: &str, status: &str) -> RealtimeEvent {
    document_event("orders", "update", json!({"$id": id, "status": status}))
}

pub fn order_deleted(id: &str) -> RealtimeEvent {
    document_event("orders", "delete", json!({"$id": id}))
}

pub fn table_updated(number: u32, status: &str) -> RealtimeEvent {
    document_event(
        "tables",
        "update",
        json!({"$id": format!("table-{number}"), "number": number, "status": status}),
    )
}

pub fn stock_updated(item: &str, quantity: i64) -> RealtimeEvent {
    document_event(
        "stock",
        "update",
        json!({"$id": item, "quantity": quantity}),
    )
}

/// Documents as the store would list them for the `orders` collection.
pub fn open_orders() -> Vec<Value> {
    vec![
        json!({"$id": "o-1", "table": 2, "status": "open", "createdAt": 10}),
        json!({"$id": "o-2", "table": 5, "status": "served", "createdAt": 20}),
        json!({"$id": "o-3", "table": 7, "status": "open", "createdAt": 30}),
    ]
}
