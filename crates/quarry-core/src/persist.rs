//! Persistence preference carried from a catalog to its entries.

use serde::{Deserialize, Serialize};

/// How a resolved source should treat locally persisted copies.
///
/// The client only carries this value from a catalog to its entries and on
/// to nested catalogs; acting on it belongs to whoever opens the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    /// Use a persisted copy if one exists.
    #[default]
    Default,
    /// Always use the persisted copy, creating it if needed.
    Always,
    /// Never use persisted copies.
    Never,
}
