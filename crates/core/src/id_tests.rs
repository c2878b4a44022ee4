// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("test");
}

#[test]
fn define_id_new_has_prefix() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("test"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn define_id_two_new_ids_differ() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn define_id_from_string_round_trips() {
    let id = TestId::from_string("test-fixed-id-0000000");
    assert_eq!(id.as_str(), "test-fixed-id-0000000");
}

#[test]
fn define_id_suffix_strips_prefix() {
    let id = TestId::from_string("testabc");
    assert_eq!(id.suffix(), "abc");
}

#[test]
fn define_id_short_truncates_suffix() {
    let id = TestId::from_string("testabcdefgh");
    assert_eq!(id.short(4), "abcd");
}

#[test]
fn define_id_display_matches_as_str() {
    let id = TestId::new();
    assert_eq!(id.to_string(), id.as_str());
}

#[test]
fn define_id_hash_map_lookup_by_str() {
    let id = TestId::new();
    let mut map = HashMap::new();
    map.insert(id, 42);
    assert_eq!(map.get(id.as_str()), Some(&42));
}

#[test]
fn define_id_equality_with_str() {
    let id = TestId::from_string("testxyz");
    assert_eq!(id, "testxyz");
    let owned = String::from("testxyz");
    assert_eq!(id.as_str(), owned);
}

#[test]
fn idbuf_new_truncates_debug_assert_boundary() {
    let id = IdBuf::new("short");
    assert_eq!(id.as_str(), "short");
    assert!(!id.is_empty());
}

#[test]
fn idbuf_empty_is_empty() {
    assert!(IdBuf::empty().is_empty());
}

#[test]
fn short_fn_truncates() {
    assert_eq!(short("abcdefghijklmnop", 8), "abcdefgh");
    assert_eq!(short("abc", 8), "abc");
}
