use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Partition of extension storage an instance reads from and writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Per-device storage.
    Local,
    /// Storage synced across the user's signed-in browsers.
    Sync,
    /// Policy-provided storage. Read-only for extension code.
    Managed,
}

impl StorageArea {
    pub const ALL: [StorageArea; 3] = [StorageArea::Local, StorageArea::Sync, StorageArea::Managed];

    /// Area name as reported by change notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Local => "local",
            StorageArea::Sync => "sync",
            StorageArea::Managed => "managed",
        }
    }

    /// Returns true if extension code cannot write to this area.
    pub fn is_read_only(&self) -> bool {
        matches!(self, StorageArea::Managed)
    }
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageArea {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(StorageArea::Local),
            "sync" => Ok(StorageArea::Sync),
            "managed" => Ok(StorageArea::Managed),
            other => Err(BackendError::UnknownArea(other.to_string())),
        }
    }
}
