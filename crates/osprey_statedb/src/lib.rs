pub mod memory;
pub mod updates;

pub use memory::MemStateDb;
pub use updates::{HashedUpdateBatch, PubAndHashUpdates, StagedValue, UpdateBatch};

use osprey_common::error::StateDbError;
use osprey_common::types::Height;

/// A value at a point in ledger history, with its key-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub metadata: Option<Vec<u8>>,
    pub version: Height,
}

impl VersionedValue {
    pub fn new(value: impl Into<Vec<u8>>, metadata: Option<Vec<u8>>, version: Height) -> Self {
        Self {
            value: value.into(),
            metadata,
            version,
        }
    }
}

/// Read capability onto the committed world state.
///
/// The validation pipeline shares one handle across all transactions of a
/// block and issues only point lookups; implementations must tolerate
/// concurrent readers. Public keys live under `(namespace, key)`;
/// private-data collections store key hashes under
/// `(namespace, collection, key_hash)`.
///
/// Absent keys and absent metadata are `Ok(None)`, never an error.
pub trait StateDb {
    fn get_state(&self, ns: &str, key: &[u8]) -> Result<Option<VersionedValue>, StateDbError>;

    fn get_state_metadata(&self, ns: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StateDbError>;

    fn get_value_hash(
        &self,
        ns: &str,
        coll: &str,
        key_hash: &[u8],
    ) -> Result<Option<VersionedValue>, StateDbError>;

    fn get_private_data_metadata_by_hash(
        &self,
        ns: &str,
        coll: &str,
        key_hash: &[u8],
    ) -> Result<Option<Vec<u8>>, StateDbError>;
}
