// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crate-wide error taxonomy.
//!
//! Business errors (`Cycle`, `DepthExceeded`, `InsufficientBudget`, `Overrun`,
//! `InvalidTransition`, `NotFound`) are distinguished from transport/storage
//! errors so callers can pattern-match on them without string comparison.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition: {entity} {from} -> {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("cycle detected: {0}")]
    Cycle(String),

    #[error("depth exceeded: {depth} > max {max_depth}")]
    DepthExceeded { depth: u32, max_depth: u32 },

    #[error("insufficient budget: parent has {available} remaining, requested {requested}")]
    InsufficientBudget { available: i64, requested: i64 },

    #[error("budget overrun: consuming {amount} would exceed remaining {remaining}")]
    Overrun { amount: i64, remaining: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("external collaborator failure: {0}")]
    External(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the kernel may safely retry the operation once in-process.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
