//! In-memory state database.
//!
//! The default backend for tests and single-process deployments. Lookups
//! come from the validation pipeline on many transactions against one
//! shared handle; mutation happens only between blocks, when the committer
//! flushes a block's update batch.

use std::collections::HashMap;

use parking_lot::RwLock;

use osprey_common::error::StateDbError;

use crate::{StateDb, VersionedValue};

#[derive(Debug, Default)]
pub struct MemStateDb {
    public: RwLock<HashMap<(String, Vec<u8>), VersionedValue>>,
    hashed: RwLock<HashMap<(String, String, Vec<u8>), VersionedValue>>,
}

impl MemStateDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_state(&self, ns: &str, key: &[u8], vv: VersionedValue) {
        self.public
            .write()
            .insert((ns.to_string(), key.to_vec()), vv);
    }

    pub fn delete_state(&self, ns: &str, key: &[u8]) {
        self.public.write().remove(&(ns.to_string(), key.to_vec()));
    }

    pub fn put_value_hash(&self, ns: &str, coll: &str, key_hash: &[u8], vv: VersionedValue) {
        self.hashed
            .write()
            .insert((ns.to_string(), coll.to_string(), key_hash.to_vec()), vv);
    }

    pub fn delete_value_hash(&self, ns: &str, coll: &str, key_hash: &[u8]) {
        self.hashed
            .write()
            .remove(&(ns.to_string(), coll.to_string(), key_hash.to_vec()));
    }
}

impl StateDb for MemStateDb {
    fn get_state(&self, ns: &str, key: &[u8]) -> Result<Option<VersionedValue>, StateDbError> {
        Ok(self
            .public
            .read()
            .get(&(ns.to_string(), key.to_vec()))
            .cloned())
    }

    fn get_state_metadata(&self, ns: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StateDbError> {
        Ok(self
            .public
            .read()
            .get(&(ns.to_string(), key.to_vec()))
            .and_then(|vv| vv.metadata.clone()))
    }

    fn get_value_hash(
        &self,
        ns: &str,
        coll: &str,
        key_hash: &[u8],
    ) -> Result<Option<VersionedValue>, StateDbError> {
        Ok(self
            .hashed
            .read()
            .get(&(ns.to_string(), coll.to_string(), key_hash.to_vec()))
            .cloned())
    }

    fn get_private_data_metadata_by_hash(
        &self,
        ns: &str,
        coll: &str,
        key_hash: &[u8],
    ) -> Result<Option<Vec<u8>>, StateDbError> {
        Ok(self
            .hashed
            .read()
            .get(&(ns.to_string(), coll.to_string(), key_hash.to_vec()))
            .and_then(|vv| vv.metadata.clone()))
    }
}
