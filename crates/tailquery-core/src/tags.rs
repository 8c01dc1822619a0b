// ── Tag derivation ──
//
// Tags are not fetched on their own: they are computed from a device
// snapshot, so tag tables always agree with the device table they were
// derived from.

use std::collections::HashSet;
use std::collections::hash_set;

use crate::model::{Device, DeviceTag};

/// Distinct tag labels.
///
/// Iteration order is unspecified and may differ between two sets built
/// from the same devices. Callers that need a stable order must sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(HashSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. Returns `true` if it was not already present.
    pub fn add(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    /// Remove a tag. Returns `true` if it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl IntoIterator for TagSet {
    type Item = String;
    type IntoIter = hash_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Union of every device's tags, duplicates collapsed.
pub fn distinct_tags(devices: &[Device]) -> TagSet {
    let mut tags = TagSet::new();
    for tag in devices.iter().flat_map(|d| d.tags.iter()) {
        tags.add(tag.as_str());
    }
    tags
}

/// Flattened membership relation in device order, then each device's own
/// tag order. A device listing a tag twice yields two pairs.
pub fn device_tag_pairs(devices: &[Device]) -> Vec<DeviceTag> {
    devices
        .iter()
        .flat_map(|device| {
            device.tags.iter().map(|tag| DeviceTag {
                device_id: device.id.clone(),
                tag: tag.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn device(id: &str, tags: &[&str]) -> Device {
        Device {
            id: id.into(),
            name: String::new(),
            hostname: String::new(),
            authorized: true,
            ephemeral: false,
            external: false,
            user: String::new(),
            client_version: String::new(),
            os: String::new(),
            distro: None,
            last_seen: None,
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    #[test]
    fn distinct_tags_collapses_duplicates() {
        let devices = [device("d1", &["a", "b"]), device("d2", &["b", "c"])];
        let tags = distinct_tags(&devices);

        assert_eq!(tags.len(), 3);
        // Order is unspecified: compare sorted.
        let mut sorted: Vec<_> = tags.iter().collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn pairs_preserve_device_then_tag_order() {
        let devices = [device("d1", &["a", "b"]), device("d2", &["b", "c"])];
        let pairs: Vec<_> = device_tag_pairs(&devices)
            .into_iter()
            .map(|p| (p.device_id, p.tag))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("d1".to_owned(), "a".to_owned()),
                ("d1".to_owned(), "b".to_owned()),
                ("d2".to_owned(), "b".to_owned()),
                ("d2".to_owned(), "c".to_owned()),
            ]
        );
    }

    #[test]
    fn untagged_devices_contribute_nothing() {
        let devices = [device("d1", &[]), device("d2", &[])];
        assert!(distinct_tags(&devices).is_empty());
        assert!(device_tag_pairs(&devices).is_empty());
    }

    #[test]
    fn tag_set_add_reports_novelty() {
        let mut tags = TagSet::new();
        assert!(tags.add("tag:web"));
        assert!(!tags.add("tag:web"));
        assert!(tags.contains("tag:web"));
        assert!(!tags.contains("tag:db"));
    }

    #[test]
    fn tag_set_remove_reports_presence() {
        let mut tags = TagSet::new();
        tags.add("tag:web");
        tags.add("tag:db");

        assert!(tags.remove("tag:web"));
        assert!(!tags.remove("tag:web"));
        assert!(!tags.contains("tag:web"));
        assert_eq!(tags.len(), 1);

        assert!(tags.remove("tag:db"));
        assert!(tags.is_empty());
    }
}
