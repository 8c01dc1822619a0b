// ── User domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tailnet user. `user_type`, `role`, and `status` are passed through
/// as the API spells them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub login_name: String,
    pub tailnet_id: String,
    pub user_type: String,
    pub role: String,
    pub status: String,
    pub device_count: i64,
    pub connected: bool,
    pub created: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}
