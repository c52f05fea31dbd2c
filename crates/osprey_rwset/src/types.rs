//! Parsed read-write set of a simulated transaction.
//!
//! A transaction simulates against a snapshot of world state and records
//! what it read and what it intends to write. Public keys appear in the
//! clear; private-data collection keys and values appear only as hashes.
//! The wire encoding of these records is owned by the endorsement layer;
//! this crate models them already parsed.

use osprey_common::types::Height;

use crate::metadata::MetadataEntry;

/// The full read-write set of one transaction, one record per namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRwSet {
    pub ns_rw_sets: Vec<NsRwSet>,
}

/// Reads and writes within one namespace, plus the hashed mirrors for each
/// private-data collection the transaction touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NsRwSet {
    pub namespace: String,
    pub kv_rw_set: KvRwSet,
    pub coll_hashed_rw_sets: Vec<CollHashedRwSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvRwSet {
    pub reads: Vec<KvRead>,
    pub writes: Vec<KvWrite>,
    pub metadata_writes: Vec<KvMetadataWrite>,
}

/// A key read during simulation, with the committed version observed at
/// read time. `version` is `None` when the key did not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRead {
    pub key: String,
    pub version: Option<Height>,
}

/// An intended write: a new value for the key, or its deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvWrite {
    pub key: String,
    pub is_delete: bool,
    pub value: Vec<u8>,
}

/// An intended metadata change. `entries` of `None` or empty clears the
/// key's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvMetadataWrite {
    pub key: String,
    pub entries: Option<Vec<MetadataEntry>>,
}

/// Hashed reads/writes for one private-data collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollHashedRwSet {
    pub collection_name: String,
    pub hashed_rw_set: HashedRwSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashedRwSet {
    pub hashed_writes: Vec<KvWriteHash>,
    pub metadata_writes: Vec<KvMetadataWriteHash>,
}

/// The hashed mirror of a [`KvWrite`]: key and value replaced by hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvWriteHash {
    pub key_hash: Vec<u8>,
    pub is_delete: bool,
    pub value_hash: Vec<u8>,
}

/// The hashed mirror of a [`KvMetadataWrite`]. Metadata entries themselves
/// are not hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvMetadataWriteHash {
    pub key_hash: Vec<u8>,
    pub entries: Option<Vec<MetadataEntry>>,
}
