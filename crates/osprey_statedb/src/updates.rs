//! Block-local staging of not-yet-persisted updates.
//!
//! While a block is being validated, each transaction's prepared operations
//! are folded into these batches before anything reaches the state
//! database. Later transactions in the same block must observe them as the
//! freshest state, so lookups here take precedence over the database.
//!
//! Deletions are staged as explicit tombstones. A tombstone means "an
//! earlier transaction in this block removed the key": the key is absent,
//! and the database must NOT be consulted, because its committed value is
//! stale.

use std::collections::HashMap;

use osprey_common::types::Height;

use crate::VersionedValue;

/// Effect of an earlier in-block transaction on one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedValue {
    Upsert(VersionedValue),
    Delete(Height),
}

impl StagedValue {
    /// The staged value, or `None` for a tombstone.
    pub fn as_upsert(&self) -> Option<&VersionedValue> {
        match self {
            StagedValue::Upsert(vv) => Some(vv),
            StagedValue::Delete(_) => None,
        }
    }
}

/// Staged updates for public (non-collection) keys, per namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBatch {
    updates: HashMap<String, HashMap<Vec<u8>, StagedValue>>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, ns: &str, key: Vec<u8>, vv: VersionedValue) {
        self.ns_entry(ns).insert(key, StagedValue::Upsert(vv));
    }

    pub fn delete(&mut self, ns: &str, key: Vec<u8>, height: Height) {
        self.ns_entry(ns).insert(key, StagedValue::Delete(height));
    }

    pub fn get(&self, ns: &str, key: &[u8]) -> Option<&StagedValue> {
        self.updates.get(ns)?.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.values().all(|ns| ns.is_empty())
    }

    fn ns_entry(&mut self, ns: &str) -> &mut HashMap<Vec<u8>, StagedValue> {
        self.updates.entry(ns.to_string()).or_default()
    }
}

/// Staged updates for private-data collection key hashes, per
/// namespace/collection pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashedUpdateBatch {
    updates: HashMap<(String, String), HashMap<Vec<u8>, StagedValue>>,
}

impl HashedUpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, ns: &str, coll: &str, key_hash: Vec<u8>, vv: VersionedValue) {
        self.coll_entry(ns, coll)
            .insert(key_hash, StagedValue::Upsert(vv));
    }

    pub fn delete(&mut self, ns: &str, coll: &str, key_hash: Vec<u8>, height: Height) {
        self.coll_entry(ns, coll)
            .insert(key_hash, StagedValue::Delete(height));
    }

    pub fn get(&self, ns: &str, coll: &str, key_hash: &[u8]) -> Option<&StagedValue> {
        self.updates
            .get(&(ns.to_string(), coll.to_string()))?
            .get(key_hash)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.values().all(|coll| coll.is_empty())
    }

    fn coll_entry(&mut self, ns: &str, coll: &str) -> &mut HashMap<Vec<u8>, StagedValue> {
        self.updates
            .entry((ns.to_string(), coll.to_string()))
            .or_default()
    }
}

/// The public and hashed staging views, paired. One instance accumulates
/// the whole block; the preparation stage of transaction `n` reads the
/// effects of transactions `0..n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PubAndHashUpdates {
    pub pub_updates: UpdateBatch,
    pub hash_updates: HashedUpdateBatch,
}

impl PubAndHashUpdates {
    pub fn new() -> Self {
        Self::default()
    }
}
