// ── Domain model ──
//
// Immutable snapshots of tailnet resources. The service never mutates
// them; it only fetches fresh lists and replaces the old ones.

pub mod device;
pub mod user;

pub use device::{Device, DeviceTag, Distro};
pub use user::User;
