// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ak-storage: the durable write-ahead log, materialized state, and the
//! `Store` transactional façade the rest of the kernel mutates through.

pub mod snapshot;
pub mod state;
pub mod store;
pub mod wal;

pub use snapshot::Snapshot;
pub use state::{find_by_prefix, MaterializedState};
pub use store::Store;
pub use wal::{Wal, WalEntry};
