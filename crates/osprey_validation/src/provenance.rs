//! Lineage extraction for optimistic-concurrency analysis.
//!
//! When a ledger runs with lineage support, a transaction's write stream
//! carries marker records alongside real writes: a write whose key ends in
//! `_prov` is not data but an annotation naming, underscore-delimited in
//! its value, the keys its subject depends on. This module strips the
//! markers, builds the per-key dependency map, derives the read-snapshot
//! block number, and replays the real writes with the annotations attached.
//!
//! Hashed collection writes never carry lineage; only the public write
//! stream participates.

use std::collections::HashMap;

use osprey_common::config::ValidationConfig;
use osprey_rwset::KvRwSet;

use crate::tx_ops::{CompositeKey, TxOps};

/// Suffix distinguishing dependency markers from real writes.
const PROV_SUFFIX: &str = "_prov";

/// Apply a namespace's public writes with dependency annotations attached.
/// Markers are consumed here and never surface as operations.
pub(crate) fn apply_writes_with_deps(
    txops: &mut TxOps,
    ns: &str,
    rw_set: &KvRwSet,
    cfg: &ValidationConfig,
) {
    let dep_snapshot = derive_dep_snapshot(ns, rw_set, cfg);
    let deps = extract_deps(rw_set);
    tracing::debug!(namespace = ns, count = deps.len(), deps = ?deps, "extracted write dependencies");

    for write in &rw_set.writes {
        if write.key.ends_with(PROV_SUFFIX) {
            continue;
        }
        let key_deps = deps.get(write.key.as_str()).cloned().unwrap_or_default();
        let ck = CompositeKey::public(ns, &write.key);
        if write.is_delete {
            txops.delete_with_dep(ck, key_deps, dep_snapshot);
        } else {
            txops.upsert_with_dep(ck, write.value.clone(), key_deps, dep_snapshot);
        }
    }
}

/// Snapshot block number the transaction's reads were served at;
/// `u64::MAX` means no snapshot read was used.
///
/// Under OCC every read carries the version it observed and the last read
/// in stream order wins; a read without a version resets to `u64::MAX`.
/// Outside OCC the reads are logged but the snapshot stays `u64::MAX`.
fn derive_dep_snapshot(ns: &str, rw_set: &KvRwSet, cfg: &ValidationConfig) -> u64 {
    let mut dep_snapshot = u64::MAX;
    for read in &rw_set.reads {
        match read.version {
            Some(version) => tracing::debug!(
                namespace = ns,
                key = %read.key,
                block_num = version.block_num,
                "lineage read"
            ),
            None => tracing::debug!(namespace = ns, key = %read.key, "lineage read, no version"),
        }
        if cfg.occ {
            dep_snapshot = read.version.map_or(u64::MAX, |v| v.block_num);
        }
    }
    dep_snapshot
}

/// Dependency map from marker writes.
///
/// A marker with key `X_prov` contributes `deps[X]`, where `X` is the
/// segment before the first underscore and the marker's value is split on
/// underscores with empty segments dropped.
fn extract_deps(rw_set: &KvRwSet) -> HashMap<String, Vec<String>> {
    let mut deps = HashMap::new();
    for write in &rw_set.writes {
        if !write.key.ends_with(PROV_SUFFIX) {
            continue;
        }
        let subject = write
            .key
            .split('_')
            .next()
            .unwrap_or_default()
            .to_string();
        let value = String::from_utf8_lossy(&write.value);
        let dep_keys: Vec<String> = value
            .split('_')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        deps.insert(subject, dep_keys);
    }
    deps
}
