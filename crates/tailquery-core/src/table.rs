// ── Table generators ──
//
// The four tables the host can scan, their column schemas, and the
// generate callbacks. Every scan is a full scan: query constraints are
// accepted for protocol compatibility and ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::CoreError;
use crate::project::{Row, device_row, device_tag_row, tag_row, user_row};
use crate::service::{ResourceKey, TailnetService, Upstream};
use crate::tags::{device_tag_pairs, distinct_tags};

// ── Schema ───────────────────────────────────────────────────────

/// Declared column type as the host understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Integer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            column_type: ColumnType::Text,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            column_type: ColumnType::Integer,
        }
    }
}

const DEVICE_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::text("id"),
    ColumnDefinition::text("name"),
    ColumnDefinition::text("authorized"),
    ColumnDefinition::text("user"),
    ColumnDefinition::text("client_version"),
    ColumnDefinition::text("hostname"),
    ColumnDefinition::text("ephemeral"),
    ColumnDefinition::text("external"),
    ColumnDefinition::text("os"),
    ColumnDefinition::text("distro_name"),
    ColumnDefinition::text("distro_version"),
    ColumnDefinition::text("last_seen"),
];

const USER_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::text("id"),
    ColumnDefinition::text("display_name"),
    ColumnDefinition::text("login_name"),
    ColumnDefinition::text("tailnet_id"),
    ColumnDefinition::text("type"),
    ColumnDefinition::text("role"),
    ColumnDefinition::text("status"),
    ColumnDefinition::integer("device_count"),
    ColumnDefinition::text("connected"),
    ColumnDefinition::text("created"),
    ColumnDefinition::text("last_seen"),
];

const TAG_COLUMNS: &[ColumnDefinition] = &[ColumnDefinition::text("tag")];

const DEVICE_TAG_COLUMNS: &[ColumnDefinition] =
    &[ColumnDefinition::text("id"), ColumnDefinition::text("tag")];

// ── Tables ───────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum TableKind {
    #[strum(serialize = "tailscale_devices")]
    Devices,
    #[strum(serialize = "tailscale_users")]
    Users,
    #[strum(serialize = "tailscale_tags")]
    Tags,
    #[strum(serialize = "tailscale_device_tags")]
    DeviceTags,
}

impl TableKind {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Look a table up by its host-facing name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        name.parse().map_err(|_| CoreError::UnknownTable {
            name: name.to_owned(),
        })
    }

    pub fn columns(self) -> &'static [ColumnDefinition] {
        match self {
            Self::Devices => DEVICE_COLUMNS,
            Self::Users => USER_COLUMNS,
            Self::Tags => TAG_COLUMNS,
            Self::DeviceTags => DEVICE_TAG_COLUMNS,
        }
    }

    /// Upstream resource the table is derived from.
    pub fn resource(self) -> ResourceKey {
        match self {
            Self::Users => ResourceKey::Users,
            Self::Devices | Self::Tags | Self::DeviceTags => ResourceKey::Devices,
        }
    }
}

// ── Query context ────────────────────────────────────────────────

/// Predicate hints sent by the host, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(default)]
    pub constraints: BTreeMap<String, Vec<Constraint>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Host operator code (e.g. 2 for `=`).
    pub op: u8,
    #[serde(default)]
    pub expr: String,
}

// ── Generation ───────────────────────────────────────────────────

/// Produce every row of `kind`. Constraints in `ctx` are not applied.
///
/// An upstream failure fails the whole scan: there are no partial results.
pub async fn generate<U: Upstream>(
    service: &TailnetService<U>,
    kind: TableKind,
    _ctx: &QueryContext,
) -> Result<Vec<Row>, CoreError> {
    let rows = match kind {
        TableKind::Devices => service.devices().await?.iter().map(device_row).collect(),
        TableKind::Users => service.users().await?.iter().map(user_row).collect(),
        TableKind::Tags => distinct_tags(&service.devices().await?)
            .iter()
            .map(tag_row)
            .collect(),
        TableKind::DeviceTags => device_tag_pairs(&service.devices().await?)
            .iter()
            .map(device_tag_row)
            .collect(),
    };
    Ok(rows)
}

/// One registrable table: a name, a schema, and a generate callback.
pub struct TablePlugin<U = tailquery_api::TailscaleClient> {
    kind: TableKind,
    service: TailnetService<U>,
}

impl<U: Upstream> TablePlugin<U> {
    pub fn new(kind: TableKind, service: TailnetService<U>) -> Self {
        Self { kind, service }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn columns(&self) -> &'static [ColumnDefinition] {
        self.kind.columns()
    }

    pub async fn generate(&self, ctx: &QueryContext) -> Result<Vec<Row>, CoreError> {
        generate(&self.service, self.kind, ctx).await
    }
}

/// Every table, ready to hand to the host's registration API. Tables are
/// independent, so the order carries no meaning.
pub fn table_plugins<U: Upstream>(service: &TailnetService<U>) -> Vec<TablePlugin<U>> {
    TableKind::iter()
        .map(|kind| TablePlugin::new(kind, service.clone()))
        .collect()
}
