pub mod provenance;
pub mod tx_ops;


pub use tx_ops::{prepare_tx_ops, CompositeKey, KeyOps, KeyOpsFlag, TxOps};
