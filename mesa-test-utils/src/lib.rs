// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities and fixtures for the Mesa+ realtime workspace.
//!
//! Designed for development and testing only.
//!
//! - [`MockTransport`] stands in for the realtime client: it counts channel
//!   opens/closes and lets a test push events with [`MockTransport::emit`].
//! - [`MockDocumentSource`] stands in for the document store used by resync.
//! - [`CallRecorder`] captures callback invocations with their (paused) time.
//! - [`test_data`] builds order/table/stock events shaped like the real ones.
//!
//! Timing tests run under `tokio::time::pause()`; use
//! [`helpers::advance_and_settle`] so timer tasks get to run after the clock moves.

pub mod helpers;
pub mod mock_source;
pub mod mock_transport;
pub mod recorder;
pub mod test_data;

pub use mock_source::MockDocumentSource;
pub use mock_transport::{MockSubscription, MockTransport};
pub use recorder::CallRecorder;
