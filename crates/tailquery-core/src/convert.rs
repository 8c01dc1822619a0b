// ── API-to-domain type conversions ──
//
// Bridges raw `tailquery_api` response types into `tailquery_core::model`
// domain types: picks the stable identifier, parses timestamps, and
// drops empty distro payloads.

use chrono::{DateTime, Utc};

use tailquery_api::models::{ApiDevice, ApiDistro, ApiUser};

use crate::model::{Device, Distro, User};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp, treating empty or malformed values as absent.
fn parse_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

// ── Device ─────────────────────────────────────────────────────────

impl From<ApiDistro> for Distro {
    fn from(d: ApiDistro) -> Self {
        Distro {
            name: d.name,
            version: d.version,
        }
    }
}

impl From<ApiDevice> for Device {
    fn from(d: ApiDevice) -> Self {
        let last_seen = parse_datetime(d.last_seen.as_deref());
        // Older payloads only carry the legacy numeric id.
        let id = if d.node_id.is_empty() { d.id } else { d.node_id };

        Device {
            id,
            name: d.name,
            hostname: d.hostname,
            authorized: d.authorized,
            ephemeral: d.is_ephemeral,
            external: d.is_external,
            user: d.user,
            client_version: d.client_version,
            os: d.os,
            distro: d.distro.map(Distro::from),
            last_seen,
            tags: d.tags,
        }
    }
}

// ── User ───────────────────────────────────────────────────────────

impl From<ApiUser> for User {
    fn from(u: ApiUser) -> Self {
        User {
            created: parse_datetime(u.created.as_deref()),
            last_seen: parse_datetime(u.last_seen.as_deref()),
            id: u.id,
            display_name: u.display_name,
            login_name: u.login_name,
            tailnet_id: u.tailnet_id,
            user_type: u.user_type,
            role: u.role,
            status: u.status,
            device_count: u.device_count,
            connected: u.currently_connected,
        }
    }
}
