use std::cmp::Reverse;
use std::fmt::{Display, Formatter};

use crate::nav::SELECTION_SEPARATOR;

/// Namespaces offered when the cluster cannot be asked for its own list.
pub const DEFAULT_NAMESPACES: [&str; 4] =
    ["default", "kube-system", "kube-public", "kube-node-lease"];

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(namespace) => Some(namespace),
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "All namespaces"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Nodes,
    Pods,
    Applications,
    Events,
    ClusterMetrics,
}

impl ResourceKind {
    pub const ALL: [Self; 5] = [
        Self::Nodes,
        Self::Pods,
        Self::Applications,
        Self::Events,
        Self::ClusterMetrics,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Nodes => "Nodes",
            Self::Pods => "Pods",
            Self::Applications => "Applications",
            Self::Events => "Events",
            Self::ClusterMetrics => "Cluster metrics",
        }
    }

    /// Kinds whose listing depends on the selected namespace.
    pub fn namespaced(self) -> bool {
        matches!(self, Self::Pods | Self::Applications)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum AppKind {
    CronJob,
    DaemonSet,
    Deployment,
    Job,
    ReplicaSet,
    StatefulSet,
}

impl AppKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::CronJob => "CronJob",
            Self::DaemonSet => "DaemonSet",
            Self::Deployment => "Deployment",
            Self::Job => "Job",
            Self::ReplicaSet => "ReplicaSet",
            Self::StatefulSet => "StatefulSet",
        }
    }

    fn from_menu(label: &str) -> Option<Self> {
        match label {
            "CronJobs" => Some(Self::CronJob),
            "DaemonSets" => Some(Self::DaemonSet),
            "Deployments" => Some(Self::Deployment),
            "Jobs" => Some(Self::Job),
            "ReplicaSets" => Some(Self::ReplicaSet),
            "StatefulSets" => Some(Self::StatefulSet),
            _ => None,
        }
    }
}

/// What the content pane shows for a menu selection.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ContentView {
    ClusterInfo,
    Namespaces,
    ResourceUsage,
    Events,
    Applications(Option<AppKind>),
    Nodes,
    Pods,
    Placeholder(String),
}

impl ContentView {
    pub fn from_selection(id: &str) -> Self {
        let (parent, leaf) = match id.split_once(SELECTION_SEPARATOR) {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, id),
        };

        match (parent, leaf) {
            (None, "Overview") | (Some("Overview"), "Cluster Info") => Self::ClusterInfo,
            (Some("Overview"), "Namespaces") => Self::Namespaces,
            (Some("Overview"), "Resource Usage") => Self::ResourceUsage,
            (Some("Overview"), "Events") | (None, "Events") => Self::Events,
            (None, "Applications") | (Some("Workloads"), "Overview") => Self::Applications(None),
            (None, "Nodes") => Self::Nodes,
            (Some("Workloads"), "Pods") | (None, "Pods") => Self::Pods,
            (Some("Workloads"), label) => match AppKind::from_menu(label) {
                Some(kind) => Self::Applications(Some(kind)),
                None => Self::Placeholder(id.to_string()),
            },
            _ => Self::Placeholder(id.to_string()),
        }
    }

    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            Self::ClusterInfo | Self::ResourceUsage => Some(ResourceKind::ClusterMetrics),
            Self::Events => Some(ResourceKind::Events),
            Self::Applications(_) => Some(ResourceKind::Applications),
            Self::Nodes => Some(ResourceKind::Nodes),
            Self::Pods => Some(ResourceKind::Pods),
            Self::Namespaces | Self::Placeholder(_) => None,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::ClusterInfo => "Cluster Overview".to_string(),
            Self::Namespaces => "Namespaces".to_string(),
            Self::ResourceUsage => "Resource Usage".to_string(),
            Self::Events => "Events".to_string(),
            Self::Applications(None) => "Applications".to_string(),
            Self::Applications(Some(kind)) => format!("{}s", kind.title()),
            Self::Nodes => "Nodes".to_string(),
            Self::Pods => "Pods".to_string(),
            Self::Placeholder(id) => id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NodeInfo {
    pub name: String,
    pub ready: bool,
    pub roles: Vec<String>,
    pub age: String,
    pub version: String,
    pub os: String,
    pub architecture: String,
    pub cpu_capacity: String,
    pub memory_capacity: String,
}

impl NodeInfo {
    pub fn status(&self) -> &'static str {
        if self.ready { "Ready" } else { "NotReady" }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub ready_containers: usize,
    pub total_containers: usize,
    pub restarts: i32,
    pub age: String,
    pub node: String,
    pub ip: String,
    pub containers: Vec<String>,
}

impl PodInfo {
    pub fn ready(&self) -> String {
        format!("{}/{}", self.ready_containers, self.total_containers)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ApplicationInfo {
    pub name: String,
    pub kind: AppKind,
    pub namespace: String,
    pub status: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub age: String,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct EventInfo {
    pub event_type: String,
    pub reason: String,
    pub object: String,
    pub message: String,
    pub count: i32,
    pub namespace: String,
    /// Unix seconds of the most recent activity.
    pub last_seen: i64,
    pub age: String,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NodeMetrics {
    pub total: usize,
    pub ready: usize,
    pub not_ready: usize,
    pub cpu_capacity_millicores: u64,
    pub cpu_allocatable_millicores: u64,
    pub memory_capacity_bytes: u64,
    pub memory_allocatable_bytes: u64,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PodMetrics {
    pub total: usize,
    pub running: usize,
    pub pending: usize,
    pub failed: usize,
    pub succeeded: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ClusterMetrics {
    pub nodes: NodeMetrics,
    pub pods: PodMetrics,
    pub recent_events: Vec<EventInfo>,
}

/// Ordering applied to every successful snapshot before it is stored.
pub trait SnapshotOrder: Sized {
    fn order(items: &mut [Self]);
}

impl SnapshotOrder for NodeInfo {
    fn order(items: &mut [Self]) {
        items.sort_by(|left, right| left.name.cmp(&right.name));
    }
}

impl SnapshotOrder for PodInfo {
    fn order(items: &mut [Self]) {
        items.sort_by(|left, right| left.name.cmp(&right.name));
    }
}

impl SnapshotOrder for ApplicationInfo {
    fn order(items: &mut [Self]) {
        items.sort_by(|left, right| {
            left.kind
                .title()
                .cmp(right.kind.title())
                .then_with(|| left.name.cmp(&right.name))
        });
    }
}

impl SnapshotOrder for EventInfo {
    fn order(items: &mut [Self]) {
        items.sort_by_key(|event| Reverse(event.last_seen));
    }
}

impl SnapshotOrder for ClusterMetrics {
    fn order(_items: &mut [Self]) {}
}

#[cfg(test)]
mod tests {
    use super::{
        AppKind, ApplicationInfo, ContentView, EventInfo, NamespaceScope, PodInfo, ResourceKind,
        SnapshotOrder,
    };

    fn app(name: &str, kind: AppKind) -> ApplicationInfo {
        ApplicationInfo {
            name: name.to_string(),
            kind,
            namespace: "default".to_string(),
            status: "Running".to_string(),
            replicas: 1,
            ready_replicas: 1,
            age: "1d".to_string(),
        }
    }

    #[test]
    fn selections_map_to_views() {
        assert_eq!(ContentView::from_selection("Overview"), ContentView::ClusterInfo);
        assert_eq!(
            ContentView::from_selection("Overview > Cluster Info"),
            ContentView::ClusterInfo
        );
        assert_eq!(
            ContentView::from_selection("Overview > Events"),
            ContentView::Events
        );
        assert_eq!(ContentView::from_selection("Nodes"), ContentView::Nodes);
        assert_eq!(
            ContentView::from_selection("Workloads > Pods"),
            ContentView::Pods
        );
        assert_eq!(
            ContentView::from_selection("Workloads > Overview"),
            ContentView::Applications(None)
        );
        assert_eq!(
            ContentView::from_selection("Workloads > StatefulSets"),
            ContentView::Applications(Some(AppKind::StatefulSet))
        );
        assert_eq!(
            ContentView::from_selection("Workloads > ReplicationControllers"),
            ContentView::Placeholder("Workloads > ReplicationControllers".to_string())
        );
    }

    #[test]
    fn views_know_their_resource_kind() {
        assert_eq!(
            ContentView::ResourceUsage.resource_kind(),
            Some(ResourceKind::ClusterMetrics)
        );
        assert_eq!(ContentView::Namespaces.resource_kind(), None);
        assert_eq!(
            ContentView::Applications(Some(AppKind::Job)).resource_kind(),
            Some(ResourceKind::Applications)
        );
    }

    #[test]
    fn applications_sort_by_type_then_name() {
        let mut apps = vec![
            app("web", AppKind::StatefulSet),
            app("zeta", AppKind::Deployment),
            app("alpha", AppKind::Deployment),
            app("nightly", AppKind::CronJob),
        ];
        ApplicationInfo::order(&mut apps);
        let order = apps
            .iter()
            .map(|app| app.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["nightly", "alpha", "zeta", "web"]);
    }

    #[test]
    fn events_sort_most_recent_first() {
        let mut events = [10, 30, 20]
            .into_iter()
            .map(|last_seen| EventInfo {
                last_seen,
                ..EventInfo::default()
            })
            .collect::<Vec<_>>();
        EventInfo::order(&mut events);
        let order = events.iter().map(|e| e.last_seen).collect::<Vec<_>>();
        assert_eq!(order, vec![30, 20, 10]);
    }

    #[test]
    fn pods_sort_by_name() {
        let mut pods = ["b", "c", "a"]
            .into_iter()
            .map(|name| PodInfo {
                name: name.to_string(),
                ..PodInfo::default()
            })
            .collect::<Vec<_>>();
        PodInfo::order(&mut pods);
        assert_eq!(pods[0].name, "a");
        assert_eq!(pods[2].name, "c");
    }

    #[test]
    fn scope_display() {
        assert_eq!(NamespaceScope::All.to_string(), "All namespaces");
        assert_eq!(
            NamespaceScope::Named("default".to_string()).to_string(),
            "default"
        );
        assert_eq!(NamespaceScope::All.namespace(), None);
    }
}
