// ── Row projection ──
//
// Pure, deterministic mapping from domain objects to flat rows. Every
// value is text: booleans as `true`/`false`, integers in decimal,
// timestamps as RFC 3339 UTC with second precision. An absent distro
// renders as "", an absent timestamp as the zero time.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::{Device, DeviceTag, User};

/// One table row: column name to rendered value.
pub type Row = BTreeMap<String, String>;

/// Rendering of an absent timestamp.
pub const ZERO_TIMESTAMP: &str = "0001-01-01T00:00:00Z";

/// Render a timestamp as `2024-01-02T03:04:05Z`; absent renders [`ZERO_TIMESTAMP`].
pub fn format_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map_or_else(
        || ZERO_TIMESTAMP.to_owned(),
        |t| t.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn row<const N: usize>(fields: [(&str, String); N]) -> Row {
    fields
        .into_iter()
        .map(|(column, value)| (column.to_owned(), value))
        .collect()
}

pub fn device_row(device: &Device) -> Row {
    let (distro_name, distro_version) = device
        .distro
        .as_ref()
        .map(|d| (d.name.clone(), d.version.clone()))
        .unwrap_or_default();

    row([
        ("id", device.id.clone()),
        ("name", device.name.clone()),
        ("authorized", device.authorized.to_string()),
        ("user", device.user.clone()),
        ("client_version", device.client_version.clone()),
        ("hostname", device.hostname.clone()),
        ("ephemeral", device.ephemeral.to_string()),
        ("external", device.external.to_string()),
        ("os", device.os.clone()),
        ("distro_name", distro_name),
        ("distro_version", distro_version),
        ("last_seen", format_timestamp(device.last_seen.as_ref())),
    ])
}

pub fn user_row(user: &User) -> Row {
    row([
        ("id", user.id.clone()),
        ("display_name", user.display_name.clone()),
        ("login_name", user.login_name.clone()),
        ("tailnet_id", user.tailnet_id.clone()),
        ("type", user.user_type.clone()),
        ("role", user.role.clone()),
        ("status", user.status.clone()),
        ("device_count", user.device_count.to_string()),
        ("connected", user.connected.to_string()),
        ("created", format_timestamp(user.created.as_ref())),
        ("last_seen", format_timestamp(user.last_seen.as_ref())),
    ])
}

pub fn tag_row(tag: &str) -> Row {
    row([("tag", tag.to_owned())])
}

pub fn device_tag_row(pair: &DeviceTag) -> Row {
    row([("id", pair.device_id.clone()), ("tag", pair.tag.clone())])
}
