pub type DeviceId = String;

/// Label of the node that collects devices lacking a value for a grouping key.
/// An inventory group with this exact name shares the same node.
pub const UNGROUPED: &str = "Ungrouped";

/// One managed host, as normalized from the inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub name: String,
    /// Primary management address (hostname or IP, no prefix length)
    pub address: String,
    /// One value per configured grouping key, in grouping order
    pub groups: Vec<Option<String>>,
    pub status: Option<String>,
}

impl DeviceRecord {
    /// An ad-hoc record for a host typed by the user rather than taken from the inventory.
    pub fn quick_connect(host: &str) -> Self {
        Self {
            id: format!("quick:{}", host),
            name: host.to_string(),
            address: host.to_string(),
            groups: Vec::new(),
            status: None,
        }
    }

    pub fn group(&self, depth: usize) -> Option<&str> {
        self.groups.get(depth).and_then(|g| g.as_deref())
    }
}

/// A node of the navigation hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuNode {
    Group {
        label: String,
        children: Vec<MenuNode>,
    },
    Device {
        label: String,
        device: DeviceRecord,
    },
}

impl MenuNode {
    pub fn label(&self) -> &str {
        match self {
            Self::Group { label, .. } | Self::Device { label, .. } => label,
        }
    }

    pub fn children(&self) -> &[MenuNode] {
        match self {
            Self::Group { children, .. } => children,
            Self::Device { .. } => &[],
        }
    }

    pub fn device(&self) -> Option<&DeviceRecord> {
        match self {
            Self::Device { device, .. } => Some(device),
            Self::Group { .. } => None,
        }
    }

    /// Number of devices at or below this node
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Device { .. } => 1,
            Self::Group { children, .. } => children.iter().map(MenuNode::leaf_count).sum(),
        }
    }

    /// Device nodes at or below this node, in display order
    pub fn leaves(&self) -> Vec<&MenuNode> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a MenuNode>) {
        match self {
            Self::Device { .. } => out.push(self),
            Self::Group { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    pub fn child(&self, label: &str) -> Option<&MenuNode> {
        self.children().iter().find(|c| c.label() == label)
    }

    /// Follow a path of child indices from this node
    pub fn descend(&self, path: &[usize]) -> Option<&MenuNode> {
        path.iter()
            .try_fold(self, |node, &idx| node.children().get(idx))
    }

    /// Case-insensitive substring match against this node's label or the
    /// display name of any device below it. `needle` must already be lowercase.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        if self.label().to_lowercase().contains(needle) {
            return true;
        }
        match self {
            Self::Device { device, .. } => device.name.to_lowercase().contains(needle),
            Self::Group { children, .. } => children.iter().any(|c| c.matches_lowercase(needle)),
        }
    }
}

/// How a dispatched session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Normal,
    ConnectionFailure,
    UserInterrupted,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::ConnectionFailure => "connection failure",
            Self::UserInterrupted => "interrupted",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    pub device_id: DeviceId,
    pub status: SessionStatus,
    pub diagnostic: Option<String>,
    pub exit_code: Option<i32>,
}
