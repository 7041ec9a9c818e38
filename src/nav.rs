use crate::fuzzy;
use serde::Deserialize;

/// Separator between a folder and its child in a selection id.
pub const SELECTION_SEPARATOR: &str = " > ";

/// One root entry of the resource menu.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct NavItem {
    pub name: String,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub expanded: bool,
    #[serde(skip)]
    pub level: usize,
}

impl NavItem {
    pub fn leaf(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            expanded: false,
            level: 0,
        }
    }

    pub fn folder(name: &str, children: &[&str], expanded: bool) -> Self {
        Self {
            name: name.to_string(),
            children: children.iter().map(|child| child.to_string()).collect(),
            expanded,
            level: 0,
        }
    }

    pub fn is_folder(&self) -> bool {
        !self.children.is_empty()
    }
}

/// A flattened menu row.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VisibleItem {
    pub name: String,
    pub parent: Option<String>,
    pub is_folder: bool,
    pub expanded: bool,
    pub level: usize,
}

impl VisibleItem {
    /// Selection id: `"Parent > Child"` for children, the bare name for roots.
    pub fn id(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent}{SELECTION_SEPARATOR}{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationTree {
    items: Vec<NavItem>,
    cursor: usize,
    selected: Option<String>,
    search: Option<String>,
}

impl Default for NavigationTree {
    fn default() -> Self {
        Self::new(default_items())
    }
}

impl NavigationTree {
    pub fn new(mut items: Vec<NavItem>) -> Self {
        for item in &mut items {
            item.level = 0;
        }
        Self {
            items,
            cursor: 0,
            selected: None,
            search: None,
        }
    }

    pub fn items(&self) -> &[NavItem] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn search_active(&self) -> bool {
        self.search.is_some()
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Rows currently on screen, honouring the active search query.
    pub fn visible(&self) -> Vec<VisibleItem> {
        self.visible_items(self.search.as_deref().unwrap_or(""))
    }

    /// Flattens the menu for `query`.
    ///
    /// With an empty query the persisted `expanded` flags decide which
    /// children show. Otherwise a root stays when it or one of its children
    /// matches: a matching root shows all of its children, a non-matching
    /// root shows only the matching ones.
    pub fn visible_items(&self, query: &str) -> Vec<VisibleItem> {
        let mut rows = Vec::new();
        for item in &self.items {
            let children = if query.is_empty() {
                if item.expanded {
                    item.children.iter().collect::<Vec<_>>()
                } else {
                    Vec::new()
                }
            } else if fuzzy::matches(&item.name, query) {
                item.children.iter().collect()
            } else {
                let matching = item
                    .children
                    .iter()
                    .filter(|child| fuzzy::matches(child, query))
                    .collect::<Vec<_>>();
                if matching.is_empty() {
                    continue;
                }
                matching
            };

            rows.push(VisibleItem {
                name: item.name.clone(),
                parent: None,
                is_folder: item.is_folder(),
                expanded: !children.is_empty(),
                level: item.level,
            });
            rows.extend(children.into_iter().map(|child| VisibleItem {
                name: child.clone(),
                parent: Some(item.name.clone()),
                is_folder: false,
                expanded: false,
                level: item.level + 1,
            }));
        }
        rows
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.visible().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = next as usize;
    }

    /// Expands or collapses the folder under the cursor, or selects the leaf.
    ///
    /// Returns `true` only when a leaf was selected.
    pub fn toggle(&mut self) -> bool {
        let Some(row) = self.visible().get(self.cursor).cloned() else {
            return false;
        };

        if row.parent.is_none() && row.is_folder {
            if let Some(item) = self.items.iter_mut().find(|item| item.name == row.name) {
                item.expanded = !item.expanded;
            }
            self.place_cursor_on_root(&row.name);
            return false;
        }

        self.selected = Some(row.id());
        true
    }

    /// Forces the root under the cursor closed. Child rows are left alone.
    pub fn collapse(&mut self) {
        let Some(row) = self.visible().get(self.cursor).cloned() else {
            return;
        };
        if row.parent.is_some() {
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|item| item.name == row.name) {
            item.expanded = false;
        }
        self.place_cursor_on_root(&row.name);
    }

    /// Marks `id` selected and moves the cursor onto it when it is visible.
    pub fn select(&mut self, id: &str) {
        self.selected = Some(id.to_string());
        if let Some(index) = self.visible().iter().position(|row| row.id() == id) {
            self.cursor = index;
        }
    }

    pub fn start_search(&mut self) {
        if self.search.is_none() {
            self.search = Some(String::new());
            self.cursor = 0;
        }
    }

    pub fn push_search_char(&mut self, c: char) {
        if let Some(query) = self.search.as_mut() {
            query.push(c);
            self.cursor = 0;
        }
    }

    pub fn pop_search_char(&mut self) {
        if let Some(query) = self.search.as_mut() {
            query.pop();
            self.cursor = 0;
        }
    }

    /// Leaves search mode, keeping the cursor on the same logical row when
    /// that row exists in the unfiltered menu and resetting it otherwise.
    pub fn end_search(&mut self) {
        if self.search.is_none() {
            return;
        }

        let current = self.visible().get(self.cursor).cloned();
        self.search = None;
        self.cursor = current
            .and_then(|current| {
                self.visible()
                    .iter()
                    .position(|row| row.name == current.name && row.parent == current.parent)
            })
            .unwrap_or(0);
    }

    fn place_cursor_on_root(&mut self, name: &str) {
        if let Some(index) = self
            .visible()
            .iter()
            .position(|row| row.parent.is_none() && row.name == name)
        {
            self.cursor = index;
        }
    }
}

pub fn default_items() -> Vec<NavItem> {
    vec![
        NavItem::folder(
            "Overview",
            &["Cluster Info", "Namespaces", "Resource Usage", "Events"],
            true,
        ),
        NavItem::leaf("Applications"),
        NavItem::leaf("Nodes"),
        NavItem::folder(
            "Workloads",
            &[
                "Overview",
                "Pods",
                "Deployments",
                "DaemonSets",
                "StatefulSets",
                "ReplicaSets",
                "ReplicationControllers",
                "Jobs",
                "CronJobs",
            ],
            false,
        ),
    ]
}
