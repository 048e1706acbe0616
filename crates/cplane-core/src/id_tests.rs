// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn worker_id_new_has_prefix() {
    let id = WorkerId::new();
    assert!(id.as_str().starts_with("wrk-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn worker_id_new_is_unique() {
    assert_ne!(WorkerId::new(), WorkerId::new());
}

#[test]
fn worker_id_from_string_round_trips() {
    let id = WorkerId::from_string("wrk-abc");
    assert_eq!(id.as_str(), "wrk-abc");
    assert_eq!(id.suffix(), "abc");
}

#[test]
fn worker_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(WorkerId::from_string("wrk-abc"), 42);
    assert_eq!(map.get("wrk-abc"), Some(&42));
}

#[test]
fn request_id_short_truncates() {
    let id = RequestId::from_string("req-abcdefghijklmnop");
    assert_eq!(id.short(4), "abcd");
}

#[test]
fn short_fn_on_str() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

#[test]
fn id_serde_round_trips() {
    let id = SessionId::from_string("ses-xyz");
    let json = serde_json::to_string(&id).expect("serialize");
    let back: SessionId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(id, back);
}
