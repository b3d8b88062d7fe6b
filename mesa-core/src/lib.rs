// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod cancellation_token;
pub mod channel_key;
pub mod duration_ms;
pub mod event;
#[cfg(feature = "runtime-tokio")]
pub mod mesa_task;
pub mod query;

pub use self::cancellation_token::CancellationToken;
pub use self::channel_key::ChannelKey;
pub use self::event::{EventKind, RealtimeEvent};
#[cfg(feature = "runtime-tokio")]
pub use self::mesa_task::MesaTask;
pub use self::query::{DocumentQuery, Query};
pub use mesa_error::{MesaError, Result};
