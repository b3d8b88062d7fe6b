// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Error types for the Mesa+ realtime core.
//!
//! Every fallible operation in the workspace returns [`MesaError`]. Most of
//! them never reach the caller: callback panics and resync failures are
//! contained and logged where they happen, and only subscribe-time failures
//! (bad channel, transport refused, limit reached, multiplexer closed) are
//! returned.
//!
//! # Examples
//!
//! ```
//! use mesa_error::{MesaError, Result};
//!
//! fn open(channel: &str) -> Result<()> {
//!     Err(MesaError::transport(channel, "socket not connected"))
//! }
//!
//! assert!(open("orders").unwrap_err().is_recoverable());
//! ```

use std::time::Duration;

/// Root error type for all Mesa+ realtime operations.
#[derive(Debug, thiserror::Error)]
pub enum MesaError {
    /// The realtime transport refused or failed to open a channel subscription.
    ///
    /// Not retried by the multiplexer; retry is the caller's concern.
    #[error("Transport failed to subscribe to '{channel}': {reason}")]
    Transport {
        /// Channel key the subscription was opened for
        channel: String,
        /// Transport-provided reason
        reason: String,
    },

    /// A channel key was empty or otherwise unusable.
    #[error("Invalid channel key: {reason}")]
    InvalidChannel {
        /// Why the key was rejected
        reason: String,
    },

    /// The multiplexer has been shut down and accepts no new registrations.
    #[error("Multiplexer is closed")]
    Closed,

    /// A bounded resource (for example the channel registry) is full.
    #[error("Resource limit exceeded: {resource} (limit: {limit})")]
    ResourceLimitExceeded {
        /// Name of the resource that hit its limit
        resource: String,
        /// The limit that was exceeded
        limit: usize,
    },

    /// A consumer callback panicked during event delivery.
    #[error("Callback panicked: {context}")]
    CallbackPanic {
        /// Channel, registration and panic message
        context: String,
    },

    /// A background task was needed but no async runtime is reachable.
    #[error("No async runtime available: {context}")]
    NoRuntime {
        /// What was being spawned
        context: String,
    },

    /// A topic named in a tracker call was never registered.
    #[error("Unknown topic: {topic}")]
    UnknownTopic {
        /// The topic name
        topic: String,
    },

    /// Manual resynchronisation of a topic failed.
    #[error("Resync of '{topic}' failed: {reason}")]
    Resync {
        /// Topic being resynchronised
        topic: String,
        /// Underlying failure
        reason: String,
    },

    /// The authoritative data source timed out.
    #[error("Operation timed out after {duration:?}: {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// How long we waited
        duration: Duration,
    },

    /// Error produced by a data source or other user-supplied component.
    #[error("Source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MesaError {
    /// Create a transport error for the given channel
    pub fn transport(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid channel error
    pub fn invalid_channel(reason: impl Into<String>) -> Self {
        Self::InvalidChannel {
            reason: reason.into(),
        }
    }

    /// Create a resource limit error
    pub fn resource_limit(resource: impl Into<String>, limit: usize) -> Self {
        Self::ResourceLimitExceeded {
            resource: resource.into(),
            limit,
        }
    }

    /// Create a callback panic error
    pub fn callback_panic(context: impl Into<String>) -> Self {
        Self::CallbackPanic {
            context: context.into(),
        }
    }

    /// Create a missing-runtime error
    pub fn no_runtime(context: impl Into<String>) -> Self {
        Self::NoRuntime {
            context: context.into(),
        }
    }

    /// Create an unknown topic error
    pub fn unknown_topic(topic: impl Into<String>) -> Self {
        Self::UnknownTopic {
            topic: topic.into(),
        }
    }

    /// Create a resync error for the given topic
    pub fn resync(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resync {
            topic: topic.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Wrap an error produced by a data source
    pub fn source(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(error))
    }

    /// Transient failures that the next periodic resync may get past.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Resync { .. } | Self::Source(_)
        )
    }

    /// Failures that will repeat on every attempt until the caller changes something.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::InvalidChannel { .. }
                | Self::Closed
                | Self::ResourceLimitExceeded { .. }
                | Self::UnknownTopic { .. }
                | Self::NoRuntime { .. }
        )
    }
}

/// Specialized Result type for Mesa+ realtime operations
pub type Result<T> = std::result::Result<T, MesaError>;

/// Helper trait for attaching a topic to a data source failure.
pub trait ResultExt<T> {
    /// Turn any error into [`MesaError::Resync`] for `topic`.
    ///
    /// # Errors
    /// Returns `Err(MesaError::Resync)` if the underlying result is `Err`.
    fn resync_context(self, topic: &str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn resync_context(self, topic: &str) -> Result<T> {
        self.map_err(|e| MesaError::resync(topic, e.to_string()))
    }
}
