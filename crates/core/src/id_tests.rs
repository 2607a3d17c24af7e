// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{CycleId, SessionId, TaskId};
use std::collections::HashMap;

#[test]
fn generated_ids_carry_prefix_and_fit_inline() {
    let id = SessionId::new();
    assert!(id.as_str().starts_with("ses-"));
    assert_eq!(id.as_str().len(), "ses-".len() + ID_RANDOM_LEN);
    assert!(id.as_str().len() <= ID_CAPACITY);
}

#[test]
fn generated_ids_are_unique() {
    let a = TaskId::new();
    let b = TaskId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips() {
    let id = CycleId::from_string("cyc-fixed");
    assert_eq!(id.as_str(), "cyc-fixed");
    assert_eq!(id, "cyc-fixed");
    assert!(!id.is_empty());
}

#[test]
fn map_keyed_by_id_is_queryable_by_str() {
    let mut map: HashMap<SessionId, u32> = HashMap::new();
    map.insert(SessionId::from_string("ses-abc"), 7);
    assert_eq!(map.get("ses-abc"), Some(&7));
}

#[test]
fn serde_is_transparent() {
    let id = TaskId::from_string("task-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"task-xyz\"");
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn oversized_input_clamps_on_char_boundary() {
    let long = "x".repeat(ID_CAPACITY + 10);
    let raw = RawId::new(&long);
    assert_eq!(raw.as_str().len(), ID_CAPACITY);

    // A multi-byte character straddling the capacity is dropped whole.
    let mut tricky = "y".repeat(ID_CAPACITY - 1);
    tricky.push('é');
    let raw = RawId::new(&tricky);
    assert_eq!(raw.as_str(), "y".repeat(ID_CAPACITY - 1));
}

#[test]
fn empty_raw_id() {
    assert!(RawId::empty().is_empty());
    assert_eq!(RawId::empty().as_str(), "");
}
