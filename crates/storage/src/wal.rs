// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only, replayable write-ahead log.
//!
//! Each line is a JSON object `{"seq": N, "event": {...}}`. The log is the
//! durable source of truth: `MaterializedState` is rebuilt by replaying every
//! entry in order. Corrupt trailing bytes (a partial write from a crash mid
//! line) are tolerated: `open` rotates the existing file to a numbered `.bak`
//! and starts a clean log containing only the entries that parsed.

use ak_core::{Event, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Number of buffered appends that forces a flush even if the interval
/// hasn't elapsed, so a long-idle WAL doesn't grow unboundedly in the OS
/// page cache before the next natural flush point.
const FLUSH_THRESHOLD: usize = 100;

/// Maximum number of rotated backups kept when corruption is detected on
/// open. Oldest is evicted.
const MAX_BACKUPS: u32 = 3;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

pub struct Wal {
    path: PathBuf,
    file: File,
    write_seq: u64,
    processed_seq: u64,
    pending_since_flush: usize,
}

impl Wal {
    /// Opens (creating if absent) the log at `path`. `processed_seq` is the
    /// sequence number already folded into a snapshot, if any; entries at or
    /// below it are skipped by `next_unprocessed`/`entries_after(0)` callers
    /// that pass it explicitly.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (write_seq, valid_lines) = Self::recover(&path)?;

        if let Some(lines) = valid_lines {
            Self::rotate_backup(&path)?;
            let mut file = File::create(&path)?;
            for line in &lines {
                writeln!(file, "{line}")?;
            }
            file.flush()?;
        }

        let file = OpenOptions::new().append(true).read(true).open(&path)?;

        Ok(Self { path, file, write_seq, processed_seq, pending_since_flush: 0 })
    }

    /// Scans the file line by line. Returns `(last_valid_seq, None)` if the
    /// whole file parsed cleanly (no rewrite needed), or
    /// `(last_valid_seq, Some(valid_lines))` if trailing corruption was found
    /// and the file must be rewritten with only the valid prefix.
    fn recover(path: &Path) -> Result<(u64, Option<Vec<String>>)> {
        if !path.exists() {
            File::create(path)?;
            return Ok((0, None));
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut valid_lines = Vec::new();
        let mut last_seq = 0u64;
        let mut saw_corruption = false;

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => {
                    saw_corruption = true;
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(&line) {
                Ok(entry) => {
                    last_seq = entry.seq;
                    valid_lines.push(line);
                }
                Err(_) => {
                    saw_corruption = true;
                    break;
                }
            }
        }

        if saw_corruption {
            Ok((last_seq, Some(valid_lines)))
        } else {
            Ok((last_seq, None))
        }
    }

    fn rotate_backup(path: &Path) -> Result<()> {
        // Shift existing .bak -> .bak.2 -> .bak.3, dropping anything older.
        for gen in (2..=MAX_BACKUPS).rev() {
            let from = Self::backup_path(path, gen - 1);
            let to = Self::backup_path(path, gen);
            if from.exists() {
                let _ = std::fs::rename(&from, &to);
            }
        }
        let first_bak = Self::backup_path(path, 1);
        if path.exists() {
            std::fs::rename(path, &first_bak)?;
        }
        Ok(())
    }

    fn backup_path(path: &Path, gen: u32) -> PathBuf {
        if gen <= 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{gen}"))
        }
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn needs_flush(&self) -> bool {
        self.pending_since_flush >= FLUSH_THRESHOLD
    }

    /// Appends one event, returning its assigned sequence number. Buffered;
    /// call `flush` (or rely on `needs_flush`) to guarantee durability.
    pub fn append(&mut self, event: &Event) -> Result<u64> {
        self.write_seq += 1;
        let entry = WalEntry { seq: self.write_seq, event: event.clone() };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{line}")?;
        self.pending_since_flush += 1;
        Ok(entry.seq)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.pending_since_flush = 0;
        Ok(())
    }

    /// Returns the next entry whose `seq > processed_seq`, advancing an
    /// internal read cursor. Returns `None` at end of file or on the first
    /// corrupt line (the writer is append-only, so a corrupt line will never
    /// spontaneously repair itself — the caller should stop polling that
    /// cursor and rely on a fresh `entries_after` read instead).
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>> {
        let entries = self.entries_after(self.processed_seq)?;
        Ok(entries.into_iter().next())
    }

    pub fn mark_processed(&mut self, seq: u64) {
        if seq > self.processed_seq {
            self.processed_seq = seq;
        }
    }

    /// Reads every entry with `seq > after` from the start of the file,
    /// stopping at the first line that fails to parse.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let mut out = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(line) {
                Ok(entry) => {
                    if entry.seq > after {
                        out.push(entry);
                    }
                }
                Err(_) => break,
            }
        }
        Ok(out)
    }

    /// Rewrites the log keeping only entries with `seq >= keep_from`, used
    /// after a snapshot makes older entries redundant for replay.
    pub fn truncate_before(&mut self, keep_from: u64) -> Result<()> {
        let entries = self.entries_after(0)?;
        let kept: Vec<WalEntry> = entries.into_iter().filter(|e| e.seq >= keep_from).collect();

        let mut file = File::create(&self.path)?;
        for entry in &kept {
            let line = serde_json::to_string(entry)?;
            writeln!(file, "{line}")?;
        }
        file.flush()?;

        self.file = OpenOptions::new().append(true).read(true).open(&self.path)?;
        Ok(())
    }

    /// Replays every entry in the log into a fresh `T` via `apply`.
    pub fn replay<T>(&self, mut apply: impl FnMut(&mut T, &Event), state: &mut T) -> Result<()> {
        for entry in self.entries_after(0)? {
            apply(state, &entry.event);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
