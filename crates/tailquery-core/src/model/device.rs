// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node in the tailnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Stable node identifier.
    pub id: String,
    pub name: String,
    pub hostname: String,
    pub authorized: bool,
    pub ephemeral: bool,
    /// Shared in from another tailnet.
    pub external: bool,
    /// Owner login name. A reference, not a link to a `User` record.
    pub user: String,
    pub client_version: String,
    pub os: String,
    pub distro: Option<Distro>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Tags in the order the API returned them.
    pub tags: Vec<String>,
}

/// Operating-system distribution reported by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distro {
    pub name: String,
    pub version: String,
}

/// One edge of the device/tag membership relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceTag {
    pub device_id: String,
    pub tag: String,
}
