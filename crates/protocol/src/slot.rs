use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// One of the two index generations that can serve traffic.
///
/// The deployment model is strictly blue/green: two slots, exactly one
/// active at a time. The label set is closed so an unknown label is a parse
/// error rather than a value that silently routes somewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSlot {
    V1,
    V2,
}

/// Raised when a wire value or marker file names a slot outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown version slot {0:?} (expected \"v1\" or \"v2\")")]
pub struct SlotParseError(pub String);

impl VersionSlot {
    /// The slot used for the initial bootstrap build and as the routing
    /// fallback when the active-version marker is unreadable.
    pub const PRIMARY: Self = Self::V1;
    /// The fixed target of watch-triggered rebuilds.
    pub const SECONDARY: Self = Self::V2;

    pub const ALL: [Self; 2] = [Self::V1, Self::V2];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    /// The alternate slot of the pair.
    pub fn other(self) -> Self {
        match self {
            Self::V1 => Self::V2,
            Self::V2 => Self::V1,
        }
    }
}

impl fmt::Display for VersionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionSlot {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => Err(SlotParseError(other.to_string())),
        }
    }
}
