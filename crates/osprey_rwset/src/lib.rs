pub mod metadata;
pub mod types;

pub use metadata::MetadataEntry;
pub use types::{
    CollHashedRwSet,
    HashedRwSet,
    KvMetadataWrite,
    KvMetadataWriteHash,
    KvRead,
    KvRwSet,
    KvWrite,
    KvWriteHash,
    NsRwSet,
    TxRwSet,
};
