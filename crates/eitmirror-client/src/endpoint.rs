//! The host's request paths.

use std::fmt;

/// One of the five host resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ElectrodesConfig,
    VerticesConfig,
    VerticesUpdate,
    ColorsConfig,
    ColorsUpdate,
}

impl Endpoint {
    /// All endpoints, in bootstrap order.
    pub const ALL: [Endpoint; 5] = [
        Self::ElectrodesConfig,
        Self::VerticesConfig,
        Self::VerticesUpdate,
        Self::ColorsConfig,
        Self::ColorsUpdate,
    ];

    /// Path relative to the host address.
    pub fn path(self) -> &'static str {
        match self {
            Self::ElectrodesConfig => "electrodes-config",
            Self::VerticesConfig => "vertices-config",
            Self::VerticesUpdate => "vertices-update",
            Self::ColorsConfig => "colors-config",
            Self::ColorsUpdate => "colors-update",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
