// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time, zstd-compressed dump of `MaterializedState`.
//!
//! A snapshot lets `Store::open` skip replaying the whole log: it restores
//! `state` as of `seq`, then the WAL only replays entries after it. Not
//! itself authoritative — the log remains the source of truth for anything
//! written after `seq`.

use crate::state::MaterializedState;
use ak_core::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Compression level favoring speed over ratio; snapshots are written on a
/// background timer, not on the hot path.
const ZSTD_LEVEL: i32 = 3;

#[derive(Serialize, Deserialize)]
pub struct Snapshot {
    pub seq: u64,
    pub state: MaterializedState,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let compressed = std::fs::read(path)?;
        let bytes = zstd::decode_all(compressed.as_slice())?;
        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        let compressed = zstd::encode_all(bytes.as_slice(), ZSTD_LEVEL)?;

        let tmp = path.with_extension("zst.tmp");
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&compressed)?;
        file.flush()?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
