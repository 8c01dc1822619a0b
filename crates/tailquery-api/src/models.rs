// Tailscale v2 API response types
//
// Wire models for the two list endpoints. Fields use `#[serde(default)]`
// liberally because `fields=all` and the default field set differ, and the
// API omits empty values. Timestamps stay as raw strings here; conversion
// into domain types happens in `tailquery-core`.

use serde::{Deserialize, Serialize};

// ── Response envelopes ───────────────────────────────────────────────

/// `GET /api/v2/tailnet/{tailnet}/devices` body.
#[derive(Debug, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub devices: Vec<ApiDevice>,
}

/// `GET /api/v2/tailnet/{tailnet}/users` body.
#[derive(Debug, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<ApiUser>,
}

/// Error body returned on non-2xx responses: `{"message": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// ── Device ───────────────────────────────────────────────────────────

/// Device object as returned with `fields=all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDevice {
    /// Legacy numeric-string identifier.
    #[serde(default)]
    pub id: String,
    /// Preferred stable identifier (`n...CNTRL`).
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub client_version: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub authorized: bool,
    #[serde(default)]
    pub is_ephemeral: bool,
    #[serde(default)]
    pub is_external: bool,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub distro: Option<ApiDistro>,
}

/// Operating-system distribution nested inside `ApiDevice`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDistro {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub code_name: String,
}

// ── User ─────────────────────────────────────────────────────────────

/// User object from the users endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub tailnet_id: String,
    #[serde(default, rename = "type")]
    pub user_type: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub device_count: i64,
    #[serde(default)]
    pub currently_connected: bool,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}
