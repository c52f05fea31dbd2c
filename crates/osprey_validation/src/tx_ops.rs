//! Per-transaction write-set preparation.
//!
//! Committing a block means folding each valid transaction's simulated
//! writes into the world state. A transaction rarely specifies a key's full
//! post-state: it may write a value without touching metadata, or change
//! metadata without rewriting the value. The missing dimension must then be
//! carried forward from the most recent prior state: an earlier
//! transaction in the same block if one touched the key, the committed
//! state database otherwise.
//!
//! The flow for one transaction:
//!
//! ```text
//! TxRwSet
//!   → TxOps::apply_tx_rwset     [projection: one KeyOps per touched key]
//!   → prepare_tx_ops            [merge: fill unspecified dimensions]
//!   → TxOps::apply_to           [drain into the block's staging batches]
//! ```
//!
//! A `TxOps` belongs to exactly one transaction-processing frame and is
//! never shared or mutated concurrently.

use std::collections::HashMap;

use bitflags::bitflags;

use osprey_common::config::ValidationConfig;
use osprey_common::error::{MetadataError, OspreyResult, StateDbError};
use osprey_common::types::Height;
use osprey_rwset::metadata::{self, MetadataEntry};
use osprey_rwset::{KvWrite, TxRwSet};
use osprey_statedb::updates::{PubAndHashUpdates, StagedValue};
use osprey_statedb::{StateDb, VersionedValue};

use crate::provenance;

bitflags! {
    /// Update dimensions a transaction touched on one key.
    ///
    /// `UPSERT_VAL` and `KEY_DELETE` are mutually exclusive, as are
    /// `METADATA_UPDATE` and `METADATA_DELETE`. Either metadata bit may
    /// combine with either value bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyOpsFlag: u8 {
        const UPSERT_VAL = 1 << 0;
        const METADATA_UPDATE = 1 << 1;
        const METADATA_DELETE = 1 << 2;
        const KEY_DELETE = 1 << 3;
    }
}

/// Identity of a ledger slot.
///
/// `coll` is empty for public keys. For private-data collections `key`
/// holds the key hash; the projection layer owns the string-to-bytes
/// conversion, so one identity type covers both worlds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub ns: String,
    pub coll: String,
    pub key: Vec<u8>,
}

impl CompositeKey {
    pub fn public(ns: &str, key: &str) -> Self {
        Self {
            ns: ns.to_string(),
            coll: String::new(),
            key: key.as_bytes().to_vec(),
        }
    }

    pub fn hashed(ns: &str, coll: &str, key_hash: &[u8]) -> Self {
        Self {
            ns: ns.to_string(),
            coll: coll.to_string(),
            key: key_hash.to_vec(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.coll.is_empty()
    }
}

/// Accumulated mutation record for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyOps {
    pub flag: KeyOpsFlag,
    pub value: Option<Vec<u8>>,
    pub metadata: Option<Vec<u8>>,
    /// Keys this write depends on. Populated only in lineage mode.
    pub deps: Vec<String>,
    /// Snapshot block number the dependencies were read at. Populated only
    /// in lineage mode, where `u64::MAX` means no snapshot read was used.
    pub dep_snapshot: u64,
}

impl KeyOps {
    /// The transaction deletes the key. Terminal: no merge applies.
    pub fn is_delete(&self) -> bool {
        self.flag.contains(KeyOpsFlag::KEY_DELETE)
    }

    /// The transaction writes both the value and a metadata change, fully
    /// specifying the key's post-state.
    pub fn is_upsert_and_metadata_update(&self) -> bool {
        self.flag.contains(KeyOpsFlag::UPSERT_VAL)
            && (self.flag.contains(KeyOpsFlag::METADATA_UPDATE)
                || self.flag.contains(KeyOpsFlag::METADATA_DELETE))
    }

    /// Only the value dimension is touched.
    pub fn is_only_upsert(&self) -> bool {
        self.flag.union(KeyOpsFlag::UPSERT_VAL) == KeyOpsFlag::UPSERT_VAL
    }

    pub(crate) fn debug_check(&self) {
        debug_assert!(!self.flag.is_empty(), "key op with no dimension bits");
        debug_assert!(
            !self
                .flag
                .contains(KeyOpsFlag::UPSERT_VAL | KeyOpsFlag::KEY_DELETE),
            "value upsert and key delete on the same key"
        );
        debug_assert!(
            !self
                .flag
                .contains(KeyOpsFlag::METADATA_UPDATE | KeyOpsFlag::METADATA_DELETE),
            "metadata update and metadata delete on the same key"
        );
    }
}

/// Canonical per-key operation list for a single transaction.
///
/// Repeated operations on a key OR new flag bits into its record and
/// overwrite the corresponding payload slot, so the last value/metadata
/// written wins. Insertion order is not observable.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TxOps {
    ops: HashMap<CompositeKey, KeyOps>,
}

impl TxOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn get(&self, k: &CompositeKey) -> Option<&KeyOps> {
        self.ops.get(k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompositeKey, &KeyOps)> {
        self.ops.iter()
    }

    // ── Mutation primitives ──────────────────────────────────────────────

    pub fn upsert(&mut self, k: CompositeKey, value: Vec<u8>) {
        let op = self.entry(k);
        op.flag.insert(KeyOpsFlag::UPSERT_VAL);
        op.value = Some(value);
    }

    pub fn delete(&mut self, k: CompositeKey) {
        self.entry(k).flag.insert(KeyOpsFlag::KEY_DELETE);
    }

    pub fn metadata_update(&mut self, k: CompositeKey, metadata: Vec<u8>) {
        let op = self.entry(k);
        op.flag.insert(KeyOpsFlag::METADATA_UPDATE);
        op.metadata = Some(metadata);
    }

    pub fn metadata_delete(&mut self, k: CompositeKey) {
        self.entry(k).flag.insert(KeyOpsFlag::METADATA_DELETE);
    }

    pub fn upsert_with_dep(
        &mut self,
        k: CompositeKey,
        value: Vec<u8>,
        deps: Vec<String>,
        dep_snapshot: u64,
    ) {
        let op = self.entry(k);
        op.flag.insert(KeyOpsFlag::UPSERT_VAL);
        op.value = Some(value);
        op.deps = deps;
        op.dep_snapshot = dep_snapshot;
    }

    pub fn delete_with_dep(&mut self, k: CompositeKey, deps: Vec<String>, dep_snapshot: u64) {
        let op = self.entry(k);
        op.flag.insert(KeyOpsFlag::KEY_DELETE);
        op.deps = deps;
        op.dep_snapshot = dep_snapshot;
    }

    fn entry(&mut self, k: CompositeKey) -> &mut KeyOps {
        self.ops.entry(k).or_default()
    }

    // ── Projection ───────────────────────────────────────────────────────

    /// Record every value write, metadata write, and hashed-collection
    /// write of a parsed read-write set.
    ///
    /// The only failure mode is metadata-entry serialization; everything
    /// else is infallible bookkeeping.
    pub fn apply_tx_rwset(&mut self, rwset: &TxRwSet, cfg: &ValidationConfig) -> OspreyResult<()> {
        for ns_rw_set in &rwset.ns_rw_sets {
            let ns = &ns_rw_set.namespace;

            if cfg.lineage_supported {
                provenance::apply_writes_with_deps(self, ns, &ns_rw_set.kv_rw_set, cfg);
            } else {
                for write in &ns_rw_set.kv_rw_set.writes {
                    self.apply_kv_write(ns, write);
                }
            }

            for mw in &ns_rw_set.kv_rw_set.metadata_writes {
                self.apply_metadata(CompositeKey::public(ns, &mw.key), mw.entries.as_deref())?;
            }

            for coll_rw_set in &ns_rw_set.coll_hashed_rw_sets {
                let coll = &coll_rw_set.collection_name;
                for hw in &coll_rw_set.hashed_rw_set.hashed_writes {
                    let ck = CompositeKey::hashed(ns, coll, &hw.key_hash);
                    if hw.is_delete {
                        self.delete(ck);
                    } else {
                        self.upsert(ck, hw.value_hash.clone());
                    }
                }
                for mw in &coll_rw_set.hashed_rw_set.metadata_writes {
                    self.apply_metadata(
                        CompositeKey::hashed(ns, coll, &mw.key_hash),
                        mw.entries.as_deref(),
                    )?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn apply_kv_write(&mut self, ns: &str, write: &KvWrite) {
        let ck = CompositeKey::public(ns, &write.key);
        if write.is_delete {
            self.delete(ck);
        } else {
            self.upsert(ck, write.value.clone());
        }
    }

    /// Empty or absent entries clear the key's metadata; anything else is
    /// serialized and recorded as an update.
    fn apply_metadata(
        &mut self,
        ck: CompositeKey,
        entries: Option<&[MetadataEntry]>,
    ) -> Result<(), MetadataError> {
        match entries {
            Some(entries) if !entries.is_empty() => {
                let raw = metadata::serialize(entries)?;
                self.metadata_update(ck, raw);
            }
            _ => self.metadata_delete(ck),
        }
        Ok(())
    }

    // ── Drain ────────────────────────────────────────────────────────────

    /// Fold this prepared operation list into the block-level staging
    /// batches at the given commit height. Deletes become staged
    /// tombstones; everything else becomes a staged upsert carrying the
    /// merged value and metadata.
    pub fn apply_to(self, updates: &mut PubAndHashUpdates, height: Height) {
        for (ck, op) in self.ops {
            if ck.coll.is_empty() {
                if op.is_delete() {
                    updates.pub_updates.delete(&ck.ns, ck.key, height);
                } else {
                    updates.pub_updates.put(
                        &ck.ns,
                        ck.key,
                        VersionedValue {
                            value: op.value.unwrap_or_default(),
                            metadata: op.metadata,
                            version: height,
                        },
                    );
                }
            } else if op.is_delete() {
                updates
                    .hash_updates
                    .delete(&ck.ns, &ck.coll, ck.key, height);
            } else {
                updates.hash_updates.put(
                    &ck.ns,
                    &ck.coll,
                    ck.key,
                    VersionedValue {
                        value: op.value.unwrap_or_default(),
                        metadata: op.metadata,
                        version: height,
                    },
                );
            }
        }
    }
}

/// Produce the canonical operation list for one transaction.
///
/// Projects `rwset` into a [`TxOps`], then post-processes every entry so it
/// is either a delete or carries both a definitive value and definitive
/// metadata:
///
/// - delete, or value plus metadata change: already final, left untouched
/// - value only: the latest metadata is carried forward
/// - metadata only: the latest value is carried forward, and if the key
///   does not exist in the latest state the entry is dropped entirely (a
///   metadata change on a missing key is a no-op)
///
/// "Latest" consults the block-local staging in `preceding_updates` first
/// and falls back to `db`. A resolver failure aborts the merge; the
/// partially mutated `TxOps` is discarded by the caller.
pub fn prepare_tx_ops(
    rwset: &TxRwSet,
    preceding_updates: &PubAndHashUpdates,
    db: &dyn StateDb,
    cfg: &ValidationConfig,
) -> OspreyResult<TxOps> {
    let mut txops = TxOps::new();
    txops.apply_tx_rwset(rwset, cfg)?;

    let keys: Vec<CompositeKey> = txops.ops.keys().cloned().collect();
    for ck in keys {
        let (is_final, is_only_upsert) = {
            let op = &txops.ops[&ck];
            op.debug_check();
            (
                op.is_delete() || op.is_upsert_and_metadata_update(),
                op.is_only_upsert(),
            )
        };
        if is_final {
            continue;
        }

        if is_only_upsert {
            let latest_metadata = retrieve_latest_metadata(&ck, preceding_updates, db)?;
            if let Some(op) = txops.ops.get_mut(&ck) {
                op.metadata = latest_metadata;
            }
            continue;
        }

        match retrieve_latest_state(&ck, preceding_updates, db)? {
            Some(latest) => {
                if let Some(op) = txops.ops.get_mut(&ck) {
                    op.value = Some(latest.value);
                }
            }
            None => {
                txops.ops.remove(&ck);
            }
        }
    }
    Ok(txops)
}

// ── Preceding-state resolver ─────────────────────────────────────────────

/// Latest value of a key: block-local staging first, state database on a
/// miss. A staged tombstone means the key does not exist and the database
/// is not consulted.
fn retrieve_latest_state(
    ck: &CompositeKey,
    preceding_updates: &PubAndHashUpdates,
    db: &dyn StateDb,
) -> Result<Option<VersionedValue>, StateDbError> {
    let staged = if ck.is_public() {
        preceding_updates.pub_updates.get(&ck.ns, &ck.key)
    } else {
        preceding_updates
            .hash_updates
            .get(&ck.ns, &ck.coll, &ck.key)
    };
    match staged {
        Some(StagedValue::Upsert(vv)) => Ok(Some(vv.clone())),
        Some(StagedValue::Delete(_)) => Ok(None),
        None if ck.is_public() => db.get_state(&ck.ns, &ck.key),
        None => db.get_value_hash(&ck.ns, &ck.coll, &ck.key),
    }
}

/// Latest metadata of a key, with the same dispatch as
/// [`retrieve_latest_state`]. Absent metadata is `None`, not an error.
fn retrieve_latest_metadata(
    ck: &CompositeKey,
    preceding_updates: &PubAndHashUpdates,
    db: &dyn StateDb,
) -> Result<Option<Vec<u8>>, StateDbError> {
    let staged = if ck.is_public() {
        preceding_updates.pub_updates.get(&ck.ns, &ck.key)
    } else {
        preceding_updates
            .hash_updates
            .get(&ck.ns, &ck.coll, &ck.key)
    };
    match staged {
        Some(StagedValue::Upsert(vv)) => Ok(vv.metadata.clone()),
        Some(StagedValue::Delete(_)) => Ok(None),
        None if ck.is_public() => db.get_state_metadata(&ck.ns, &ck.key),
        None => db.get_private_data_metadata_by_hash(&ck.ns, &ck.coll, &ck.key),
    }
}
