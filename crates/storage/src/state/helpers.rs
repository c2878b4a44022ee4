// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared lookup helpers for the materialized state submodules.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Looks up `id` by exact match first, falling back to unique-prefix
/// resolution (as with short git hashes) when no exact key exists.
pub fn find_by_prefix<'a, K, V>(map: &'a HashMap<K, V>, id: &str) -> Option<&'a V>
where
    K: Eq + Hash + Borrow<str>,
{
    if let Some(v) = map.get(id) {
        return Some(v);
    }
    let mut found = None;
    for (key, value) in map.iter() {
        if key.borrow().starts_with(id) {
            if found.is_some() {
                return None; // ambiguous prefix
            }
            found = Some(value);
        }
    }
    found
}
