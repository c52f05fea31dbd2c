use serde::{Deserialize, Serialize};

/// Per-ledger configuration.
///
/// Each channel gets its own instance; nothing here is process-global, so
/// two ledgers in one process can run with different validation behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Toggles consumed by the write-set preparation stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Extract inter-key dependency annotations and read-snapshot versions
    /// from transaction write sets (default: false).
    #[serde(default)]
    pub lineage_supported: bool,
    /// Derive dependency snapshots from the versions carried on reads.
    /// Only consulted when `lineage_supported` is true.
    #[serde(default)]
    pub occ: bool,
}
