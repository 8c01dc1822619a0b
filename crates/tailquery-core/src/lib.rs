//! Cached, relational view of a tailnet for a SQL-over-system-state host.
//!
//! - **[`TailnetService`]** owns the API client and a single-flight fetch
//!   cache ([`cache::Memoizer`]). Each upstream resource is fetched at most
//!   once per freshness window, however many tables or concurrent queries
//!   ask for it.
//!
//! - **Tables** ([`table`]): `tailscale_devices`, `tailscale_users`,
//!   `tailscale_tags` and `tailscale_device_tags`. Each is a
//!   [`TablePlugin`] with a fixed schema and a `generate` callback that
//!   returns flat string rows.
//!
//! - **Domain model** ([`model`]) plus the projection ([`project`]) and tag
//!   derivation ([`tags`]) that turn it into rows.

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod project;
pub mod service;
pub mod table;
pub mod tags;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CacheSettings, ServiceConfig};
pub use error::CoreError;
pub use model::{Device, DeviceTag, Distro, User};
pub use project::Row;
pub use service::{ResourceKey, Snapshot, TailnetService, Upstream};
pub use table::{
    ColumnDefinition, ColumnType, Constraint, QueryContext, TableKind, TablePlugin, generate,
    table_plugins,
};
pub use tags::TagSet;
