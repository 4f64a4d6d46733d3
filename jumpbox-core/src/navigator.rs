//! Menu navigation state machine.
//!
//! The navigator never touches the terminal: a frontend renders the
//! [`MenuView`] it produces and feeds back one line of input at a time.

use crate::model::{DeviceRecord, MenuNode};

/// One parsed line of user input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Empty,
    Back,
    Home,
    Quit,
    ClearFilter,
    /// Flat list of every device below the current group
    AllDevices,
    /// Flat list of devices below the current group matching the text
    Search(String),
    Connect(String),
    /// 1-based entry number
    Select(usize),
    /// A label to select or, failing that, a filter
    Text(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::Empty;
        }
        match input.to_lowercase().as_str() {
            "back" | "b" | ".." => return Self::Back,
            "home" | "h" | "/" => return Self::Home,
            "quit" | "q" | "exit" => return Self::Quit,
            "clear" => return Self::ClearFilter,
            "all" => return Self::AllDevices,
            "search" | "find" => return Self::Search(String::new()),
            _ => {}
        }
        if let Ok(n) = input.parse::<usize>() {
            return Self::Select(n);
        }
        if let Some((word, rest)) = input.split_once(char::is_whitespace) {
            let rest = rest.trim().to_string();
            if word.eq_ignore_ascii_case("connect") {
                return Self::Connect(rest);
            }
            if word.eq_ignore_ascii_case("search") || word.eq_ignore_ascii_case("find") {
                return Self::Search(rest);
            }
        }
        Self::Text(input.to_string())
    }
}

/// Observable navigator mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavMode {
    AtInterior,
    /// A flat device list replaces the current group's children
    Listing,
    Filtering,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteKind {
    Info,
    Error,
}

/// A one-line message shown under the menu on the next render
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub kind: NoteKind,
    pub text: String,
}

impl Note {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoteKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoteKind::Error,
            text: text.into(),
        }
    }
}

/// Result of applying one line of input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Still navigating; re-render, with a note when there is one
    Stay(Option<Note>),
    /// A device was chosen and should be dispatched
    Resolved(DeviceRecord),
    Exit,
}

/// Flat device lists shown in place of a group's children
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Listing {
    AllDevices,
    /// Devices whose name or address contains the query
    Search(String),
}

impl Listing {
    pub fn title(&self) -> String {
        match self {
            Self::AllDevices => "All devices".to_string(),
            Self::Search(query) => format!("Search: {}", query),
        }
    }
}

/// Where the user is in the tree
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Child indices from the root to the current group
    pub path: Vec<usize>,
    pub listing: Option<Listing>,
    pub filter: Option<String>,
}

/// One row of a rendered menu
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuEntry {
    /// 1-based number the user types to pick it
    pub number: usize,
    pub label: String,
    /// Address for devices, device count for groups
    pub detail: String,
    pub is_device: bool,
    pub status: Option<String>,
}

/// Everything a frontend needs to draw the current level
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuView {
    pub title: String,
    /// Labels from the root to the current group (root excluded)
    pub breadcrumb: Vec<String>,
    /// Title of the active flat listing
    pub listing: Option<String>,
    pub entries: Vec<MenuEntry>,
    pub filter: Option<String>,
    /// What "back" does from here
    pub back_hint: String,
    pub note: Option<Note>,
    pub quick_connect: bool,
}

enum Target {
    Device(DeviceRecord),
    /// Child index within the current group
    Group(usize),
}

pub struct Navigator {
    root: MenuNode,
    state: NavigationState,
    quick_connect: bool,
}

impl Navigator {
    pub fn new(root: MenuNode) -> Self {
        Self {
            root,
            state: NavigationState::default(),
            quick_connect: false,
        }
    }

    pub fn with_quick_connect(mut self, enabled: bool) -> Self {
        self.quick_connect = enabled;
        self
    }

    pub fn root(&self) -> &MenuNode {
        &self.root
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn mode(&self) -> NavMode {
        if self.state.filter.is_some() {
            NavMode::Filtering
        } else if self.state.listing.is_some() {
            NavMode::Listing
        } else {
            NavMode::AtInterior
        }
    }

    pub fn depth(&self) -> usize {
        self.state.path.len()
    }

    /// The group currently shown
    pub fn current(&self) -> &MenuNode {
        // path indices always come from `choose`
        self.root.descend(&self.state.path).unwrap_or(&self.root)
    }

    /// Entries of the current level after the active filter
    pub fn visible(&self) -> Vec<&MenuNode> {
        Self::filtered(self.unfiltered(), self.state.filter.as_deref())
    }

    /// The group's children, or the devices of the active listing
    fn unfiltered(&self) -> Vec<&MenuNode> {
        let current = self.current();
        match &self.state.listing {
            None => current.children().iter().collect(),
            Some(Listing::AllDevices) => current.leaves(),
            Some(Listing::Search(query)) => matching_devices(current, query),
        }
    }

    fn filtered<'a>(nodes: Vec<&'a MenuNode>, filter: Option<&str>) -> Vec<&'a MenuNode> {
        match filter.map(str::to_lowercase) {
            Some(needle) => nodes
                .into_iter()
                .filter(|node| node.matches_lowercase(&needle))
                .collect(),
            None => nodes,
        }
    }

    /// Leave the filter first, then a listing, then go up one level; no-op
    /// at a plain root.
    pub fn back(&mut self) -> bool {
        if self.state.filter.take().is_some() {
            return true;
        }
        if self.state.listing.take().is_some() {
            return true;
        }
        self.state.path.pop().is_some()
    }

    pub fn home(&mut self) {
        self.state = NavigationState::default();
    }

    pub fn apply(&mut self, input: &str) -> Step {
        match Command::parse(input) {
            Command::Empty => Step::Stay(None),
            Command::Quit => Step::Exit,
            Command::Back => {
                self.back();
                Step::Stay(None)
            }
            Command::Home => {
                self.home();
                Step::Stay(None)
            }
            Command::ClearFilter => {
                self.state.filter = None;
                Step::Stay(None)
            }
            Command::AllDevices => {
                self.state.listing = Some(Listing::AllDevices);
                self.state.filter = None;
                Step::Stay(None)
            }
            Command::Search(query) => self.search(query),
            Command::Select(n) => {
                let shown = self.visible().len();
                match n.checked_sub(1).and_then(|pos| self.choose(pos)) {
                    Some(step) => step,
                    None => Step::Stay(Some(Note::error(format!(
                        "no entry {} (choose 1-{})",
                        n, shown
                    )))),
                }
            }
            Command::Connect(host) if self.quick_connect => match validate_host(&host) {
                Ok(()) => Step::Resolved(DeviceRecord::quick_connect(&host)),
                Err(reason) => Step::Stay(Some(Note::error(reason))),
            },
            Command::Connect(_) => self.text(input.trim()),
            Command::Text(text) => self.text(&text),
        }
    }

    fn search(&mut self, query: String) -> Step {
        if query.is_empty() {
            return Step::Stay(Some(Note::error("usage: search <name or address>")));
        }
        if matching_devices(self.current(), &query).is_empty() {
            return Step::Stay(Some(Note::error(format!("no device matches '{}'", query))));
        }
        self.state.listing = Some(Listing::Search(query));
        self.state.filter = None;
        Step::Stay(None)
    }

    fn text(&mut self, text: &str) -> Step {
        let wanted = text.to_lowercase();
        let exact = self
            .visible()
            .iter()
            .position(|node| node.label().to_lowercase() == wanted);
        if let Some(step) = exact.and_then(|pos| self.choose(pos)) {
            return step;
        }

        if Self::filtered(self.unfiltered(), Some(text)).is_empty() {
            return Step::Stay(Some(Note::error(format!("nothing matches '{}'", text))));
        }
        self.state.filter = Some(text.to_string());
        Step::Stay(None)
    }

    /// Pick the visible entry at `pos`: a device resolves, a group is entered
    fn choose(&mut self, pos: usize) -> Option<Step> {
        let target = {
            let visible = self.visible();
            let node = *visible.get(pos)?;
            match node.device() {
                Some(device) => Target::Device(device.clone()),
                None => Target::Group(
                    self.current()
                        .children()
                        .iter()
                        .position(|child| std::ptr::eq(child, node))?,
                ),
            }
        };

        self.state.filter = None;
        Some(match target {
            Target::Device(device) => Step::Resolved(device),
            Target::Group(idx) => {
                self.state.path.push(idx);
                self.state.listing = None;
                Step::Stay(None)
            }
        })
    }

    pub fn breadcrumb(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.state.path.len());
        let mut node = &self.root;
        for &idx in &self.state.path {
            match node.children().get(idx) {
                Some(child) => {
                    labels.push(child.label().to_string());
                    node = child;
                }
                None => break,
            }
        }
        labels
    }

    pub fn view(&self, title: &str, note: Option<Note>) -> MenuView {
        let entries = self
            .visible()
            .into_iter()
            .enumerate()
            .map(|(i, child)| match child {
                MenuNode::Device { label, device } => MenuEntry {
                    number: i + 1,
                    label: label.clone(),
                    detail: device.address.clone(),
                    is_device: true,
                    status: device.status.clone(),
                },
                MenuNode::Group { label, .. } => {
                    let count = child.leaf_count();
                    MenuEntry {
                        number: i + 1,
                        label: label.clone(),
                        detail: format!("{} device{}", count, if count == 1 { "" } else { "s" }),
                        is_device: false,
                        status: None,
                    }
                }
            })
            .collect();

        let breadcrumb = self.breadcrumb();
        let back_hint = if self.state.filter.is_some() {
            "Clear filter".to_string()
        } else if self.state.listing.is_some() {
            format!("Return to {} menu", breadcrumb.last().map_or(title, String::as_str))
        } else {
            match breadcrumb.len() {
                0 => "Exit".to_string(),
                1 => format!("Return to {} menu", title),
                n => format!("Return to {} menu", breadcrumb[n - 2]),
            }
        };

        MenuView {
            title: title.to_string(),
            breadcrumb,
            listing: self.state.listing.as_ref().map(Listing::title),
            entries,
            filter: self.state.filter.clone(),
            back_hint,
            note,
            quick_connect: self.quick_connect,
        }
    }
}

/// Devices below `node` whose label, name or address contains `query`,
/// case-insensitively
fn matching_devices<'a>(node: &'a MenuNode, query: &str) -> Vec<&'a MenuNode> {
    let needle = query.to_lowercase();
    node.leaves()
        .into_iter()
        .filter(|leaf| {
            leaf.matches_lowercase(&needle)
                || leaf
                    .device()
                    .is_some_and(|d| d.address.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Reject quick-connect targets that ssh could read as options or that
/// carry more than a host.
fn validate_host(host: &str) -> Result<(), String> {
    if host.is_empty() {
        return Err("usage: connect <hostname or address>".into());
    }
    if host.starts_with('-') {
        return Err(format!("invalid host '{}'", host));
    }
    let ok = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'));
    if !ok {
        return Err(format!("invalid host '{}'", host));
    }
    Ok(())
}
