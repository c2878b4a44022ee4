// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional façade over the write-ahead log and materialized state.
//!
//! `Store` is the single writer path every component funnels mutations
//! through. A transaction closure reads the current state, decides which
//! facts to append, and returns them alongside whatever value the caller
//! wants back; `with_transaction` appends those facts to the log and folds
//! them into state atomically under one lock, so two concurrent writers can
//! never interleave a read-decide-write sequence.

use crate::snapshot::Snapshot;
use crate::state::MaterializedState;
use crate::wal::Wal;
use ak_core::{Error, Event, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

struct Inner {
    wal: Wal,
    state: MaterializedState,
}

/// Cloneable handle; every clone shares the same underlying lock and log.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
    dir: PathBuf,
}

impl Store {
    /// Opens (or creates) a store rooted at `dir`, replaying `wal.log` and
    /// `snapshot.zst` (if present) to rebuild in-memory state.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let snapshot_path = dir.join("snapshot.zst");
        let (mut state, processed_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => {
                debug!(seq = snapshot.seq, "restored from snapshot");
                (snapshot.state, snapshot.seq)
            }
            None => (MaterializedState::default(), 0),
        };

        let wal = Wal::open(dir.join("wal.log"), processed_seq)?;
        wal.replay(MaterializedState::apply_event, &mut state)?;

        Ok(Self { inner: Arc::new(Mutex::new(Inner { wal, state })), dir })
    }

    /// Opens a store with no backing directory, for tests that want
    /// isolated, disposable state.
    #[cfg(any(test, feature = "test-support"))]
    pub fn open_temp() -> Result<(Self, tempfile::TempDir)> {
        let dir = tempfile::tempdir().map_err(Error::Io)?;
        let store = Self::open(dir.path())?;
        Ok((store, dir))
    }

    /// Runs `f` against a read-only view of state, appending any events it
    /// returns and folding them into state before returning its value. `f`
    /// returning `Err` aborts the transaction: nothing is appended.
    #[instrument(skip_all)]
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&MaterializedState) -> Result<(Vec<Event>, T)>,
    ) -> Result<T> {
        let mut inner = self.inner.lock();
        let (events, value) = f(&inner.state)?;
        for event in &events {
            inner.wal.append(event)?;
            inner.state.apply_event(event);
        }
        if inner.wal.needs_flush() {
            inner.wal.flush()?;
        }
        Ok(value)
    }

    /// Forces durability of buffered WAL writes; called on a timer by the
    /// daemon and unconditionally during graceful shutdown.
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().wal.flush()
    }

    /// Read-only snapshot of current state for query paths that don't need
    /// to mutate anything.
    pub fn view<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        f(&self.inner.lock().state)
    }

    /// Writes a point-in-time snapshot and truncates the log up to it,
    /// bounding replay time on the next restart.
    #[instrument(skip_all)]
    pub fn compact(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.write_seq();
        Snapshot { seq, state: inner.state.clone() }.save(&self.dir.join("snapshot.zst"))?;
        inner.wal.truncate_before(seq + 1)?;
        warn!(seq, "compacted store");
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
