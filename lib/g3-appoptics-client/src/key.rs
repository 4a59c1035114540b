/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;

/// Value used for a declared label that has not been given a value.
pub const UNKNOWN_VALUE: &str = "unknown";

const KEY_SEPARATOR: &str = "__";

pub type TagMap = BTreeMap<String, String>;

/// Build the identity key of a metric instance.
///
/// Only the declared labels take part, in declared order, so the key does not
/// depend on how the tag map was built.
pub fn compute_key<S: AsRef<str>>(name: &str, labels: &[S], tags: &TagMap) -> String {
    let mut key = String::with_capacity(name.len() + KEY_SEPARATOR.len() + labels.len() * 16);
    key.push_str(name);
    key.push_str(KEY_SEPARATOR);
    for (i, label) in labels.iter().enumerate() {
        let label = label.as_ref();
        if i > 0 {
            key.push_str(KEY_SEPARATOR);
        }
        let value = tags.get(label).map(String::as_str).unwrap_or(UNKNOWN_VALUE);
        key.push_str(label);
        key.push(':');
        key.push_str(value);
    }
    key
}

/// Copy `base` and overwrite it with `pairs`, later pairs win.
pub fn merge_tags<K, V>(base: &TagMap, pairs: &[(K, V)]) -> TagMap
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut merged = base.clone();
    for (k, v) in pairs {
        merged.insert(k.as_ref().to_string(), v.as_ref().to_string());
    }
    merged
}

/// Tag map with every declared label set to [`UNKNOWN_VALUE`].
pub fn make_tags<S: AsRef<str>>(labels: &[S]) -> TagMap {
    labels
        .iter()
        .map(|l| (l.as_ref().to_string(), UNKNOWN_VALUE.to_string()))
        .collect()
}
