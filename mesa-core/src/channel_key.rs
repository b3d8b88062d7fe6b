// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{MesaError, Result};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifier of a realtime channel.
///
/// Never empty. Cheap to clone; the multiplexer keys its registry by this
/// type so two keys refer to the same channel iff their strings are equal.
///
/// ```
/// use mesa_core::ChannelKey;
///
/// let key = ChannelKey::documents("main", "orders");
/// assert_eq!(key.as_str(), "databases.main.collections.orders.documents");
/// assert!(ChannelKey::new("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelKey(Arc<str>);

impl ChannelKey {
    /// Wrap a raw channel name.
    ///
    /// # Errors
    /// Returns `MesaError::InvalidChannel` if `name` is empty or only whitespace.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if name.trim().is_empty() {
            return Err(MesaError::invalid_channel("channel key must not be empty"));
        }
        Ok(Self(Arc::from(name)))
    }

    /// Channel carrying document events of one collection.
    pub fn documents(database_id: &str, collection_id: &str) -> Self {
        Self(Arc::from(format!(
            "databases.{database_id}.collections.{collection_id}.documents"
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelKey({:?})", &*self.0)
    }
}

impl AsRef<str> for ChannelKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChannelKey {
    type Error = MesaError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ChannelKey {
    type Error = MesaError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ChannelKey> for String {
    fn from(key: ChannelKey) -> Self {
        key.0.to_string()
    }
}
