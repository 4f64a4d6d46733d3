use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::{DeviceRecord, MenuNode, UNGROUPED};

pub const ROOT_LABEL: &str = "Main";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("menu entry '{label}' under '{path}' is both a group and a device")]
    LabelCollision { path: String, label: String },

    #[error("inventory lists device id {id} twice with different data")]
    ConflictingDevice { id: String },
}

#[derive(Debug, Default)]
struct GroupBuilder {
    label: String,
    groups: Vec<GroupBuilder>,
    leaves: Vec<DeviceRecord>,
}

impl GroupBuilder {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    fn group_mut(&mut self, label: &str) -> &mut GroupBuilder {
        let idx = match self.groups.iter().position(|g| g.label == label) {
            Some(idx) => idx,
            None => {
                self.groups.push(GroupBuilder::new(label));
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx]
    }

    fn finalize(self, path: &mut Vec<String>) -> Result<MenuNode, BuildError> {
        let GroupBuilder {
            label,
            mut groups,
            mut leaves,
        } = self;

        groups.sort_by(|a, b| sort_key(&a.label).cmp(&sort_key(&b.label)));
        leaves.sort_by(|a, b| {
            sort_key(&a.name)
                .cmp(&sort_key(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });

        let leaf_labels = leaf_labels(&leaves);
        if let Some(clash) = first_duplicate(&leaf_labels) {
            return Err(BuildError::LabelCollision {
                path: display_path(path, &label),
                label: clash.to_string(),
            });
        }

        if let Some(clash) = leaf_labels
            .iter()
            .find(|l| groups.iter().any(|g| &g.label == *l))
        {
            return Err(BuildError::LabelCollision {
                path: display_path(path, &label),
                label: clash.clone(),
            });
        }

        path.push(label.clone());
        let mut children = Vec::with_capacity(groups.len() + leaves.len());
        for group in groups {
            children.push(group.finalize(path)?);
        }
        path.pop();

        children.extend(
            leaves
                .into_iter()
                .zip(leaf_labels)
                .map(|(device, label)| MenuNode::Device { label, device }),
        );

        Ok(MenuNode::Group { label, children })
    }
}

/// Device labels for one group, unique among themselves.
///
/// Colliding names get the device id appended; a renamed label can collide
/// with a real name, so this repeats until no unsuffixed leaf clashes.
fn leaf_labels(leaves: &[DeviceRecord]) -> Vec<String> {
    let mut labels: Vec<String> = leaves.iter().map(|d| d.name.clone()).collect();
    let mut suffixed = vec![false; leaves.len()];
    loop {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for l in &labels {
            *counts.entry(l.as_str()).or_default() += 1;
        }
        let clashing: Vec<usize> = (0..labels.len())
            .filter(|&i| !suffixed[i] && counts[labels[i].as_str()] > 1)
            .collect();
        if clashing.is_empty() {
            return labels;
        }
        for i in clashing {
            labels[i] = format!("{} (#{})", labels[i], leaves[i].id);
            suffixed[i] = true;
        }
    }
}

fn first_duplicate(labels: &[String]) -> Option<&str> {
    let mut seen = std::collections::BTreeSet::new();
    labels
        .iter()
        .map(String::as_str)
        .find(|l| !seen.insert(*l))
}

/// Case-insensitive first, then case-sensitive so equal-ignoring-case labels
/// still order deterministically.
fn sort_key(label: &str) -> (String, &str) {
    (label.to_lowercase(), label)
}

fn display_path(path: &[String], label: &str) -> String {
    path.iter()
        .map(String::as_str)
        .chain(std::iter::once(label))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Group a flat device list into the menu hierarchy.
///
/// Each device descends one level per grouping key, using its value for that
/// key or [`UNGROUPED`] when it has none, and ends as a leaf. Groups are
/// listed before devices; both are sorted case-insensitively. Exact duplicate
/// records are collapsed; two different records sharing an id are an error.
pub fn build(devices: &[DeviceRecord], grouping: &[String]) -> Result<MenuNode, BuildError> {
    let mut root = GroupBuilder::new(ROOT_LABEL);
    let mut seen: BTreeMap<&str, &DeviceRecord> = BTreeMap::new();

    for device in devices {
        if let Some(previous) = seen.insert(device.id.as_str(), device) {
            if previous == device {
                tracing::debug!(id = %device.id, "dropping duplicate inventory record");
                continue;
            }
            return Err(BuildError::ConflictingDevice {
                id: device.id.clone(),
            });
        }

        let mut node = &mut root;
        for depth in 0..grouping.len() {
            node = node.group_mut(device.group(depth).unwrap_or(UNGROUPED));
        }
        node.leaves.push(device.clone());
    }

    root.finalize(&mut Vec::new())
}

/// Labels from the root to the leaf wrapping `device_id`, if present
pub fn path_to(root: &MenuNode, device_id: &str) -> Option<Vec<String>> {
    match root {
        MenuNode::Device { device, .. } => (device.id == device_id).then(Vec::new),
        MenuNode::Group { children, .. } => children.iter().find_map(|child| {
            path_to(child, device_id).map(|mut rest| {
                rest.insert(0, child.label().to_string());
                rest
            })
        }),
    }
}
