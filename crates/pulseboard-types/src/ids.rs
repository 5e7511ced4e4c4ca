//! Connection identifier.
//!
//! Every WebSocket connection gets a [`ConnectionId`] when it is accepted.
//! The id doubles as the participant's identity for the lifetime of the
//! connection. Ids are UUID v7, but the registry does not rely on their
//! order; it tracks arrival order itself.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Opaque identifier for one transport connection (and its participant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
