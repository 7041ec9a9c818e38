use crate::config::PeekConfig;
use crate::connection::{ClusterError, ConnectionManager, ConnectionState, SwitchOutcome};
use crate::fuzzy;
use crate::input::Action;
use crate::model::{
    ApplicationInfo, ClusterMetrics, ContentView, DEFAULT_NAMESPACES, EventInfo,
    NamespaceScope, NodeInfo, PodInfo, ResourceKind, SnapshotOrder,
};
use crate::nav::NavigationTree;
use crate::notify::{NotificationQueue, Severity};
use crate::resource::{EventsController, ResourceController};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const ALL_NAMESPACES_LABEL: &str = "All namespaces";
pub const INITIAL_LOG_LINES: i64 = 100;
/// Rows a content table draws; the cursor never leaves them.
pub const MAX_TABLE_ROWS: usize = 50;
const MAX_LOG_LINES: usize = 1_000;
const PAGE_STEP: isize = 10;
const MAX_TIMEFRAME_INPUT: usize = 6;

/// Which component receives the next key, in priority order.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputLayer {
    Fatal,
    ContextPicker,
    TimeframeInput,
    NamespacePicker,
    Confirmation,
    Logs,
    Yaml,
    MenuSearch,
    PodFilter,
    Menu,
    Content,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FocusTarget {
    Menu,
    Content,
}

/// Side effects requested by the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Fetch {
        kind: ResourceKind,
        epoch: u64,
    },
    ValidateContext {
        context: String,
    },
    CommitContext {
        context: String,
    },
    LoadNamespaces {
        epoch: u64,
    },
    StreamLogs {
        stream: u64,
        namespace: String,
        pod: String,
        container: Option<String>,
    },
    LoadManifest {
        request: u64,
        namespace: String,
        pod: String,
    },
    CancelViewer,
    DeletePod {
        namespace: String,
        pod: String,
        restart: bool,
    },
}

#[derive(Debug, Clone)]
pub enum FetchPayload {
    Nodes(Result<Vec<NodeInfo>, String>),
    Pods(Result<Vec<PodInfo>, String>),
    Applications(Result<Vec<ApplicationInfo>, String>),
    Events(Result<Vec<EventInfo>, String>),
    ClusterMetrics(Result<ClusterMetrics, String>),
}

impl FetchPayload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Nodes(_) => ResourceKind::Nodes,
            Self::Pods(_) => ResourceKind::Pods,
            Self::Applications(_) => ResourceKind::Applications,
            Self::Events(_) => ResourceKind::Events,
            Self::ClusterMetrics(_) => ResourceKind::ClusterMetrics,
        }
    }
}

/// Results delivered by background tasks.
#[derive(Debug, Clone)]
pub enum AppMessage {
    Fetched {
        epoch: u64,
        scope: NamespaceScope,
        payload: FetchPayload,
    },
    ContextValidated {
        context: String,
        result: Result<Vec<String>, ClusterError>,
    },
    Namespaces {
        epoch: u64,
        result: Result<Vec<String>, String>,
    },
    LogLines {
        stream: u64,
        lines: Vec<String>,
    },
    LogStreamEnded {
        stream: u64,
        error: Option<String>,
    },
    Manifest {
        request: u64,
        result: Result<String, String>,
    },
    PodDeleted {
        namespace: String,
        pod: String,
        restart: bool,
        result: Result<(), String>,
    },
}

/// Filterable list used by the context and namespace pickers.
#[derive(Debug, Clone)]
pub struct Picker {
    entries: Vec<String>,
    query: String,
    cursor: usize,
}

impl Picker {
    fn new(entries: Vec<String>, current: Option<&str>) -> Self {
        let cursor = current
            .and_then(|current| entries.iter().position(|entry| entry == current))
            .unwrap_or(0);
        Self {
            entries,
            query: String::new(),
            cursor,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Entries matching the query, best matches first.
    pub fn filtered(&self) -> Vec<&str> {
        fuzzy::rank(&self.entries, &self.query)
            .into_iter()
            .map(|index| self.entries[index].as_str())
            .collect()
    }

    pub fn selected(&self) -> Option<String> {
        self.filtered().get(self.cursor).map(|entry| entry.to_string())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.filtered().len();
        self.cursor = clamp_index(self.cursor, delta, len);
    }

    fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.cursor = 0;
    }

    fn pop_char(&mut self) {
        self.query.pop();
        self.cursor = 0;
    }

    fn replace_entries(&mut self, entries: Vec<String>) {
        self.entries = entries;
        let len = self.filtered().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConfirmChoice {
    Yes,
    No,
}

#[derive(Debug, Clone)]
pub struct ConfirmationDialog {
    pub title: String,
    pub message: String,
    pub choice: ConfirmChoice,
    command: AppCommand,
}

#[derive(Debug, Clone)]
pub struct LogsViewer {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
    stream: u64,
    lines: VecDeque<String>,
    scroll: usize,
    following: bool,
    received: bool,
    ended: bool,
    error: Option<String>,
}

impl LogsViewer {
    fn new(stream: u64, namespace: String, pod: String, container: Option<String>) -> Self {
        Self {
            namespace,
            pod,
            container,
            stream,
            lines: VecDeque::new(),
            scroll: 0,
            following: true,
            received: false,
            ended: false,
            error: None,
        }
    }

    pub fn lines(&self) -> &VecDeque<String> {
        &self.lines
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn following(&self) -> bool {
        self.following
    }

    pub fn loading(&self) -> bool {
        !self.received && !self.ended
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn max_scroll(&self, height: usize) -> usize {
        self.lines.len().saturating_sub(height.max(1))
    }

    fn push_lines(&mut self, lines: Vec<String>, height: usize) {
        self.received = true;
        self.lines.extend(lines);
        let overflow = self.lines.len().saturating_sub(MAX_LOG_LINES);
        self.lines.drain(..overflow);
        if self.following {
            self.scroll = self.max_scroll(height);
        } else {
            self.scroll = self.scroll.saturating_sub(overflow);
        }
    }

    fn scroll_by(&mut self, delta: isize, height: usize) {
        let max = self.max_scroll(height);
        self.scroll = (self.scroll as isize + delta).clamp(0, max as isize) as usize;
        if delta < 0 {
            self.following = false;
        } else if self.scroll == max {
            self.following = true;
        }
    }

    fn toggle_follow(&mut self, height: usize) {
        self.following = !self.following;
        if self.following {
            self.scroll = self.max_scroll(height);
        }
    }
}

#[derive(Debug, Clone)]
pub struct YamlViewer {
    pub namespace: String,
    pub pod: String,
    request: u64,
    content: Option<String>,
    error: Option<String>,
    scroll: usize,
}

impl YamlViewer {
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    fn line_count(&self) -> usize {
        self.content.as_deref().map(|text| text.lines().count()).unwrap_or(0)
    }

    fn scroll_by(&mut self, delta: isize, height: usize) {
        let max = self.line_count().saturating_sub(height.max(1));
        self.scroll = (self.scroll as isize + delta).clamp(0, max as isize) as usize;
    }
}

#[derive(Debug, Clone)]
pub enum Overlay {
    ContextPicker(Picker),
    NamespacePicker(Picker),
    TimeframeInput(String),
    Confirmation(ConfirmationDialog),
    Logs(LogsViewer),
    Yaml(YamlViewer),
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PodFilter {
    pub query: String,
    pub typing: bool,
}

/// Render-facing summary of one controller.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct KindState<'a> {
    pub initial_load: bool,
    pub refreshing: bool,
    pub has_data: bool,
    pub error: Option<&'a str>,
}

fn kind_state<T: SnapshotOrder>(controller: &ResourceController<T>) -> KindState<'_> {
    KindState {
        initial_load: controller.is_initial_load(),
        refreshing: controller.is_refreshing(),
        has_data: controller.has_data(),
        error: controller.error(),
    }
}

fn claim_refresh<T: SnapshotOrder>(controller: &mut ResourceController<T>, now: Instant) -> bool {
    controller.should_refresh(now) && controller.begin_refresh()
}

fn clamp_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).clamp(0, len as isize - 1) as usize
}

pub struct App {
    running: bool,
    fatal: Option<String>,
    connection: ConnectionManager,
    namespace_scope: NamespaceScope,
    namespaces: Vec<String>,
    nav: NavigationTree,
    focus: FocusTarget,
    view: ContentView,
    content_cursor: usize,
    pod_filter: Option<PodFilter>,
    overlay: Option<Overlay>,
    notifications: NotificationQueue,
    nodes: ResourceController<NodeInfo>,
    pods: ResourceController<PodInfo>,
    applications: ResourceController<ApplicationInfo>,
    events: EventsController,
    metrics: ResourceController<ClusterMetrics>,
    epoch: u64,
    next_request: u64,
    viewer_height: usize,
}

impl App {
    /// Starts with the context picker open; it cannot be dismissed until a
    /// context has been validated once.
    pub fn new(
        config: &PeekConfig,
        context: String,
        contexts: Vec<String>,
        namespace_scope: NamespaceScope,
    ) -> Self {
        let picker = Picker::new(contexts.clone(), Some(&context));
        let mut nav = NavigationTree::new(config.navigation.clone());
        nav.select("Overview");
        let refresh = config.refresh;

        Self {
            running: true,
            fatal: None,
            connection: ConnectionManager::new(context, contexts),
            namespace_scope,
            namespaces: Vec::new(),
            nav,
            focus: FocusTarget::Menu,
            view: ContentView::ClusterInfo,
            content_cursor: 0,
            pod_filter: None,
            overlay: Some(Overlay::ContextPicker(picker)),
            notifications: NotificationQueue::default(),
            nodes: ResourceController::new(refresh.nodes),
            pods: ResourceController::new(refresh.pods),
            applications: ResourceController::new(refresh.applications),
            events: EventsController::new(refresh.events, config.events_timeframe_minutes),
            metrics: ResourceController::new(refresh.cluster_metrics),
            epoch: 0,
            next_request: 0,
            viewer_height: 20,
        }
    }

    /// Replaces the whole UI with an unrecoverable configuration error.
    pub fn set_fatal(&mut self, message: impl Into<String>) {
        self.fatal = Some(message.into());
        self.overlay = None;
    }

    /// Validates the committed context; used once at startup.
    pub fn begin_connection(&mut self) -> Vec<AppCommand> {
        let context = self.connection.current().to_string();
        if self.fatal.is_some() || !self.connection.request_switch(&context) {
            return Vec::new();
        }
        info!("validating context {context}");
        vec![AppCommand::ValidateContext { context }]
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn fatal(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    pub fn context(&self) -> &str {
        self.connection.current()
    }

    pub fn connection_state(&self) -> &ConnectionState {
        self.connection.state()
    }

    pub fn namespace_scope(&self) -> &NamespaceScope {
        &self.namespace_scope
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn nav(&self) -> &NavigationTree {
        &self.nav
    }

    pub fn focus(&self) -> FocusTarget {
        self.focus
    }

    pub fn view(&self) -> &ContentView {
        &self.view
    }

    pub fn content_cursor(&self) -> usize {
        self.content_cursor
    }

    pub fn pod_filter(&self) -> Option<&PodFilter> {
        self.pod_filter.as_ref()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn nodes(&self) -> &ResourceController<NodeInfo> {
        &self.nodes
    }

    pub fn pods(&self) -> &ResourceController<PodInfo> {
        &self.pods
    }

    pub fn applications(&self) -> &ResourceController<ApplicationInfo> {
        &self.applications
    }

    pub fn events(&self) -> &EventsController {
        &self.events
    }

    pub fn metrics(&self) -> &ResourceController<ClusterMetrics> {
        &self.metrics
    }

    pub fn kind_state(&self, kind: ResourceKind) -> KindState<'_> {
        match kind {
            ResourceKind::Nodes => kind_state(&self.nodes),
            ResourceKind::Pods => kind_state(&self.pods),
            ResourceKind::Applications => kind_state(&self.applications),
            ResourceKind::Events => kind_state(&*self.events),
            ResourceKind::ClusterMetrics => kind_state(&self.metrics),
        }
    }

    /// Whether the visible kind is refreshing behind already shown data.
    pub fn refreshing_visible(&self) -> bool {
        self.view
            .resource_kind()
            .is_some_and(|kind| self.kind_state(kind).refreshing)
    }

    pub fn visible_pods(&self) -> Vec<&PodInfo> {
        let query = self
            .pod_filter
            .as_ref()
            .map(|filter| filter.query.as_str())
            .unwrap_or("");
        self.pods
            .items()
            .iter()
            .filter(|pod| fuzzy::matches(&pod.name, query))
            .collect()
    }

    pub fn visible_applications(&self) -> Vec<&ApplicationInfo> {
        let only = match self.view {
            ContentView::Applications(only) => only,
            _ => None,
        };
        self.applications
            .items()
            .iter()
            .filter(|app| only.is_none_or(|kind| app.kind == kind))
            .collect()
    }

    pub fn set_viewer_height(&mut self, height: usize) {
        self.viewer_height = height.max(1);
    }

    pub fn input_layer(&self) -> InputLayer {
        if self.fatal.is_some() {
            return InputLayer::Fatal;
        }

        match &self.overlay {
            Some(Overlay::ContextPicker(_)) => InputLayer::ContextPicker,
            Some(Overlay::TimeframeInput(_)) => InputLayer::TimeframeInput,
            Some(Overlay::NamespacePicker(_)) => InputLayer::NamespacePicker,
            Some(Overlay::Confirmation(_)) => InputLayer::Confirmation,
            Some(Overlay::Logs(_)) => InputLayer::Logs,
            Some(Overlay::Yaml(_)) => InputLayer::Yaml,
            None => match self.focus {
                FocusTarget::Menu if self.nav.search_active() => InputLayer::MenuSearch,
                FocusTarget::Menu => InputLayer::Menu,
                FocusTarget::Content
                    if self.pod_filter.as_ref().is_some_and(|filter| filter.typing) =>
                {
                    InputLayer::PodFilter
                }
                FocusTarget::Content => InputLayer::Content,
            },
        }
    }

    pub fn handle_action(&mut self, action: Action, now: Instant) -> Vec<AppCommand> {
        if action == Action::Quit {
            self.running = false;
            return Vec::new();
        }
        if self.connection.is_connecting() {
            return Vec::new();
        }

        match self.input_layer() {
            InputLayer::Fatal => Vec::new(),
            InputLayer::ContextPicker => self.handle_context_picker(action),
            InputLayer::TimeframeInput => self.handle_timeframe_input(action, now),
            InputLayer::NamespacePicker => self.handle_namespace_picker(action, now),
            InputLayer::Confirmation => self.handle_confirmation(action),
            InputLayer::Logs => self.handle_logs(action),
            InputLayer::Yaml => self.handle_yaml(action),
            InputLayer::MenuSearch => self.handle_menu_search(action, now),
            InputLayer::PodFilter => self.handle_pod_filter(action),
            InputLayer::Menu | InputLayer::Content => self.handle_normal(action, now),
        }
    }

    /// Periodic housekeeping: expire notifications, schedule due refreshes.
    pub fn on_tick(&mut self, now: Instant) -> Vec<AppCommand> {
        self.notifications.clean_expired(now);
        self.refresh_visible(now)
    }

    pub fn apply_message(&mut self, message: AppMessage, now: Instant) -> Vec<AppCommand> {
        match message {
            AppMessage::Fetched {
                epoch,
                scope,
                payload,
            } => {
                let kind = payload.kind();
                if epoch != self.epoch {
                    debug!("discarding {} result from epoch {epoch}", kind.title());
                    return Vec::new();
                }
                if kind.namespaced() && scope != self.namespace_scope {
                    debug!("discarding {} result for namespace {scope}", kind.title());
                    return Vec::new();
                }
                self.apply_fetch(payload, now);
                Vec::new()
            }
            AppMessage::ContextValidated { context, result } => {
                self.apply_context_validation(context, result, now)
            }
            AppMessage::Namespaces { epoch, result } => {
                if epoch == self.epoch {
                    self.apply_namespaces(result, now);
                }
                Vec::new()
            }
            AppMessage::LogLines { stream, lines } => {
                let height = self.viewer_height;
                if let Some(Overlay::Logs(viewer)) = self.overlay.as_mut()
                    && viewer.stream == stream
                {
                    viewer.push_lines(lines, height);
                }
                Vec::new()
            }
            AppMessage::LogStreamEnded { stream, error } => {
                if let Some(Overlay::Logs(viewer)) = self.overlay.as_mut()
                    && viewer.stream == stream
                {
                    viewer.ended = true;
                    viewer.error = error;
                }
                Vec::new()
            }
            AppMessage::Manifest { request, result } => {
                if let Some(Overlay::Yaml(viewer)) = self.overlay.as_mut()
                    && viewer.request == request
                {
                    match result {
                        Ok(content) => viewer.content = Some(content),
                        Err(error) => viewer.error = Some(error),
                    }
                }
                Vec::new()
            }
            AppMessage::PodDeleted {
                namespace,
                pod,
                restart,
                result,
            } => self.apply_pod_deleted(namespace, pod, restart, result, now),
        }
    }

    fn apply_fetch(&mut self, payload: FetchPayload, now: Instant) {
        let kind = payload.kind();
        match payload {
            FetchPayload::Nodes(result) => self.nodes.apply_result(result, now),
            FetchPayload::Pods(result) => self.pods.apply_result(result, now),
            FetchPayload::Applications(result) => self.applications.apply_result(result, now),
            FetchPayload::Events(result) => self.events.apply_result(result, now),
            FetchPayload::ClusterMetrics(result) => self
                .metrics
                .apply_result(result.map(|metrics| vec![metrics]), now),
        }
        if let Some(error) = self.kind_state(kind).error {
            warn!("{} refresh failed: {error}", kind.title());
        }
        self.clamp_content_cursor();
    }

    fn apply_context_validation(
        &mut self,
        context: String,
        result: Result<Vec<String>, ClusterError>,
        now: Instant,
    ) -> Vec<AppCommand> {
        let (outcome, namespaces) = match result {
            Ok(namespaces) => (self.connection.apply_result(&context, Ok(())), namespaces),
            Err(error) => (self.connection.apply_result(&context, Err(error)), Vec::new()),
        };

        match outcome {
            SwitchOutcome::Committed => {
                info!("context {context} committed");
                self.namespaces = namespaces;
                self.epoch += 1;
                self.reset_controllers();
                if matches!(self.overlay, Some(Overlay::ContextPicker(_))) {
                    self.overlay = None;
                }
                self.nav.select("Overview");
                self.view = ContentView::ClusterInfo;
                self.focus = FocusTarget::Menu;
                self.content_cursor = 0;
                self.pod_filter = None;
                self.notifications.push(
                    Severity::Success,
                    "Context switched",
                    format!("Now using context: {context}"),
                    now,
                );

                let mut commands = vec![AppCommand::CommitContext { context }];
                commands.extend(self.refresh_visible(now));
                commands
            }
            SwitchOutcome::Failed(message) => {
                warn!("context {context} failed validation: {message}");
                if self.namespaces.is_empty() {
                    self.namespaces = default_namespaces();
                }
                if !matches!(self.overlay, Some(Overlay::ContextPicker(_))) {
                    self.open_context_picker();
                }
                Vec::new()
            }
            SwitchOutcome::Ignored => Vec::new(),
        }
    }

    fn apply_namespaces(&mut self, result: Result<Vec<String>, String>, now: Instant) {
        match result {
            Ok(namespaces) => self.namespaces = namespaces,
            Err(error) => {
                if self.namespaces.is_empty() {
                    self.namespaces = default_namespaces();
                }
                self.notifications
                    .push(Severity::Warning, "Namespaces unavailable", error, now);
            }
        }

        let entries = self.namespace_entries();
        if let Some(Overlay::NamespacePicker(picker)) = self.overlay.as_mut() {
            picker.replace_entries(entries);
        }
    }

    fn apply_pod_deleted(
        &mut self,
        namespace: String,
        pod: String,
        restart: bool,
        result: Result<(), String>,
        now: Instant,
    ) -> Vec<AppCommand> {
        match result {
            Ok(()) => {
                let (title, body) = if restart {
                    (
                        "Pod restarting",
                        format!("{namespace}/{pod} is being recreated"),
                    )
                } else {
                    ("Pod deleted", format!("Deleted {namespace}/{pod}"))
                };
                self.notifications.push(Severity::Success, title, body, now);
                self.pods.invalidate();
                self.refresh_visible(now)
            }
            Err(error) => {
                let title = if restart {
                    "Restart failed"
                } else {
                    "Delete failed"
                };
                self.notifications.push(Severity::Error, title, error, now);
                Vec::new()
            }
        }
    }

    fn handle_context_picker(&mut self, action: Action) -> Vec<AppCommand> {
        let Some(Overlay::ContextPicker(picker)) = self.overlay.as_mut() else {
            return Vec::new();
        };

        match action {
            Action::Up => picker.move_cursor(-1),
            Action::Down => picker.move_cursor(1),
            Action::InputChar(c) => picker.push_char(c),
            Action::Backspace => picker.pop_char(),
            Action::Submit => {
                let Some(candidate) = picker.selected() else {
                    return Vec::new();
                };
                self.connection.clear_error();
                if self.connection.request_switch(&candidate) {
                    info!("validating context {candidate}");
                    return vec![AppCommand::ValidateContext { context: candidate }];
                }
            }
            Action::Cancel => {
                if self.connection.connected_once() {
                    self.connection.clear_error();
                    self.overlay = None;
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_timeframe_input(&mut self, action: Action, now: Instant) -> Vec<AppCommand> {
        let Some(Overlay::TimeframeInput(input)) = self.overlay.as_mut() else {
            return Vec::new();
        };

        match action {
            Action::InputChar(c) if c.is_ascii_digit() && input.len() < MAX_TIMEFRAME_INPUT => {
                input.push(c);
            }
            Action::Backspace => {
                input.pop();
            }
            Action::Cancel => self.overlay = None,
            Action::Submit => {
                let raw = input.clone();
                match self.events.set_timeframe(&raw) {
                    Ok(minutes) => {
                        self.overlay = None;
                        self.notifications.push(
                            Severity::Success,
                            "Timeframe updated",
                            format!("Now showing events from the past {minutes} minutes"),
                            now,
                        );
                        return self.refresh_visible(now);
                    }
                    Err(error) => {
                        self.notifications.push(
                            Severity::Error,
                            "Invalid timeframe",
                            error.to_string(),
                            now,
                        );
                    }
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_namespace_picker(&mut self, action: Action, now: Instant) -> Vec<AppCommand> {
        let Some(Overlay::NamespacePicker(picker)) = self.overlay.as_mut() else {
            return Vec::new();
        };

        match action {
            Action::Up => picker.move_cursor(-1),
            Action::Down => picker.move_cursor(1),
            Action::InputChar(c) => picker.push_char(c),
            Action::Backspace => picker.pop_char(),
            Action::Cancel => self.overlay = None,
            Action::Submit => {
                let Some(selected) = picker.selected() else {
                    return Vec::new();
                };
                self.overlay = None;
                let scope = if selected == ALL_NAMESPACES_LABEL {
                    NamespaceScope::All
                } else {
                    NamespaceScope::Named(selected)
                };
                if scope != self.namespace_scope {
                    return self.change_namespace(scope, now);
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn change_namespace(&mut self, scope: NamespaceScope, now: Instant) -> Vec<AppCommand> {
        info!("namespace scope changed to {scope}");
        self.namespace_scope = scope;
        self.pods.reset();
        self.applications.reset();
        self.content_cursor = 0;
        self.notifications.push(
            Severity::Info,
            "Namespace changed",
            format!("Now viewing: {}", self.namespace_scope),
            now,
        );
        self.refresh_visible(now)
    }

    fn handle_confirmation(&mut self, action: Action) -> Vec<AppCommand> {
        let Some(Overlay::Confirmation(dialog)) = self.overlay.as_mut() else {
            return Vec::new();
        };

        match action {
            Action::Left => dialog.choice = ConfirmChoice::Yes,
            Action::Right => dialog.choice = ConfirmChoice::No,
            Action::ToggleChoice => {
                dialog.choice = match dialog.choice {
                    ConfirmChoice::Yes => ConfirmChoice::No,
                    ConfirmChoice::No => ConfirmChoice::Yes,
                };
            }
            Action::Cancel => self.overlay = None,
            Action::Submit => {
                let Some(Overlay::Confirmation(dialog)) = self.overlay.take() else {
                    return Vec::new();
                };
                if dialog.choice == ConfirmChoice::Yes {
                    info!("confirmed: {}", dialog.title);
                    return vec![dialog.command];
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_logs(&mut self, action: Action) -> Vec<AppCommand> {
        let height = self.viewer_height;
        let Some(Overlay::Logs(viewer)) = self.overlay.as_mut() else {
            return Vec::new();
        };

        match action {
            Action::Up => viewer.scroll_by(-1, height),
            Action::Down => viewer.scroll_by(1, height),
            Action::PageUp => viewer.scroll_by(-PAGE_STEP, height),
            Action::PageDown => viewer.scroll_by(PAGE_STEP, height),
            Action::Top => viewer.scroll_by(-(viewer.lines.len() as isize), height),
            Action::Bottom => viewer.scroll_by(viewer.lines.len() as isize, height),
            Action::ToggleFollow => viewer.toggle_follow(height),
            Action::Cancel => {
                debug!("closing log stream {}", viewer.stream);
                self.overlay = None;
                return vec![AppCommand::CancelViewer];
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_yaml(&mut self, action: Action) -> Vec<AppCommand> {
        let height = self.viewer_height;
        let Some(Overlay::Yaml(viewer)) = self.overlay.as_mut() else {
            return Vec::new();
        };

        match action {
            Action::Up => viewer.scroll_by(-1, height),
            Action::Down => viewer.scroll_by(1, height),
            Action::PageUp => viewer.scroll_by(-PAGE_STEP, height),
            Action::PageDown => viewer.scroll_by(PAGE_STEP, height),
            Action::Top => viewer.scroll = 0,
            Action::Bottom => viewer.scroll_by(viewer.line_count() as isize, height),
            Action::Cancel => {
                self.overlay = None;
                return vec![AppCommand::CancelViewer];
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_menu_search(&mut self, action: Action, now: Instant) -> Vec<AppCommand> {
        match action {
            Action::InputChar(c) => self.nav.push_search_char(c),
            Action::Backspace => self.nav.pop_search_char(),
            Action::Up => self.nav.move_cursor(-1),
            Action::Down => self.nav.move_cursor(1),
            Action::Cancel | Action::ToggleSearch => self.nav.end_search(),
            Action::FocusContent => self.focus = FocusTarget::Content,
            Action::Submit => {
                if self.nav.toggle() {
                    self.nav.end_search();
                    return self.on_leaf_selected(now);
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_pod_filter(&mut self, action: Action) -> Vec<AppCommand> {
        let Some(filter) = self.pod_filter.as_mut() else {
            return Vec::new();
        };

        match action {
            Action::InputChar(c) => {
                filter.query.push(c);
                self.content_cursor = 0;
            }
            Action::Backspace => {
                filter.query.pop();
                self.content_cursor = 0;
            }
            Action::Submit => filter.typing = false,
            Action::Cancel => {
                self.pod_filter = None;
                self.content_cursor = 0;
            }
            Action::Up => self.move_content_cursor(-1),
            Action::Down => self.move_content_cursor(1),
            _ => {}
        }
        Vec::new()
    }

    fn handle_normal(&mut self, action: Action, now: Instant) -> Vec<AppCommand> {
        match action {
            Action::FocusMenu => self.focus = FocusTarget::Menu,
            Action::FocusContent => self.focus = FocusTarget::Content,
            Action::OpenContextPicker => self.open_context_picker(),
            Action::OpenNamespacePicker => return self.open_namespace_picker(),
            Action::Refresh => {
                if let Some(kind) = self.view.resource_kind() {
                    self.invalidate(kind);
                }
                return self.refresh_visible(now);
            }
            _ if self.focus == FocusTarget::Menu => return self.handle_menu(action, now),
            _ => return self.handle_content(action),
        }
        Vec::new()
    }

    fn handle_menu(&mut self, action: Action, now: Instant) -> Vec<AppCommand> {
        match action {
            Action::Up => self.nav.move_cursor(-1),
            Action::Down => self.nav.move_cursor(1),
            Action::PageUp => self.nav.move_cursor(-PAGE_STEP),
            Action::PageDown => self.nav.move_cursor(PAGE_STEP),
            Action::Cancel => self.nav.collapse(),
            Action::ToggleSearch => self.nav.start_search(),
            Action::Submit => {
                if self.nav.toggle() {
                    return self.on_leaf_selected(now);
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_content(&mut self, action: Action) -> Vec<AppCommand> {
        match action {
            Action::Up => self.move_content_cursor(-1),
            Action::Down => self.move_content_cursor(1),
            Action::PageUp => self.move_content_cursor(-PAGE_STEP),
            Action::PageDown => self.move_content_cursor(PAGE_STEP),
            Action::Cancel => {
                if self.pod_filter.take().is_some() {
                    self.content_cursor = 0;
                } else {
                    self.focus = FocusTarget::Menu;
                }
            }
            Action::OpenTimeframe if self.view == ContentView::Events => {
                let current = self.events.timeframe_minutes().to_string();
                self.overlay = Some(Overlay::TimeframeInput(current));
            }
            Action::StartPodFilter if self.view == ContentView::Pods => {
                let query = self
                    .pod_filter
                    .take()
                    .map(|filter| filter.query)
                    .unwrap_or_default();
                self.pod_filter = Some(PodFilter {
                    query,
                    typing: true,
                });
            }
            Action::ShowLogs => return self.open_logs(),
            Action::ShowYaml => return self.open_yaml(),
            Action::DeletePod => self.confirm_pod_action(false),
            Action::RestartPod => self.confirm_pod_action(true),
            _ => {}
        }
        Vec::new()
    }

    fn on_leaf_selected(&mut self, now: Instant) -> Vec<AppCommand> {
        let Some(selected) = self.nav.selected() else {
            return Vec::new();
        };
        self.view = ContentView::from_selection(selected);
        debug!("content view {:?}", self.view);
        self.focus = FocusTarget::Content;
        self.content_cursor = 0;
        self.pod_filter = None;
        self.refresh_visible(now)
    }

    fn open_context_picker(&mut self) {
        self.connection.clear_error();
        let picker = Picker::new(
            self.connection.contexts().to_vec(),
            Some(self.connection.current()),
        );
        self.overlay = Some(Overlay::ContextPicker(picker));
    }

    fn open_namespace_picker(&mut self) -> Vec<AppCommand> {
        let current = match &self.namespace_scope {
            NamespaceScope::All => ALL_NAMESPACES_LABEL,
            NamespaceScope::Named(namespace) => namespace.as_str(),
        };
        let picker = Picker::new(self.namespace_entries(), Some(current));
        self.overlay = Some(Overlay::NamespacePicker(picker));
        vec![AppCommand::LoadNamespaces { epoch: self.epoch }]
    }

    fn namespace_entries(&self) -> Vec<String> {
        std::iter::once(ALL_NAMESPACES_LABEL.to_string())
            .chain(self.namespaces.iter().cloned())
            .collect()
    }

    fn selected_pod(&self) -> Option<&PodInfo> {
        if self.view != ContentView::Pods {
            return None;
        }
        self.visible_pods().get(self.content_cursor).copied()
    }

    fn confirm_pod_action(&mut self, restart: bool) {
        let Some(pod) = self.selected_pod() else {
            return;
        };
        let namespace = pod.namespace.clone();
        let name = pod.name.clone();
        let (title, message) = if restart {
            (
                "Restart Pod",
                format!(
                    "Restart pod {namespace}/{name}? It will be deleted and recreated by its controller."
                ),
            )
        } else {
            (
                "Delete Pod",
                format!("Are you sure you want to delete pod {namespace}/{name}?"),
            )
        };

        self.overlay = Some(Overlay::Confirmation(ConfirmationDialog {
            title: title.to_string(),
            message,
            choice: ConfirmChoice::No,
            command: AppCommand::DeletePod {
                namespace,
                pod: name,
                restart,
            },
        }));
    }

    fn open_logs(&mut self) -> Vec<AppCommand> {
        let Some(pod) = self.selected_pod() else {
            return Vec::new();
        };
        let namespace = pod.namespace.clone();
        let name = pod.name.clone();
        let container = pod.containers.first().cloned();

        self.next_request += 1;
        let stream = self.next_request;
        info!("streaming logs for {namespace}/{name}");
        self.overlay = Some(Overlay::Logs(LogsViewer::new(
            stream,
            namespace.clone(),
            name.clone(),
            container.clone(),
        )));
        vec![AppCommand::StreamLogs {
            stream,
            namespace,
            pod: name,
            container,
        }]
    }

    fn open_yaml(&mut self) -> Vec<AppCommand> {
        let Some(pod) = self.selected_pod() else {
            return Vec::new();
        };
        let namespace = pod.namespace.clone();
        let name = pod.name.clone();

        self.next_request += 1;
        let request = self.next_request;
        self.overlay = Some(Overlay::Yaml(YamlViewer {
            namespace: namespace.clone(),
            pod: name.clone(),
            request,
            content: None,
            error: None,
            scroll: 0,
        }));
        vec![AppCommand::LoadManifest {
            request,
            namespace,
            pod: name,
        }]
    }

    fn content_len(&self) -> usize {
        let len = match &self.view {
            ContentView::Pods => self.visible_pods().len(),
            ContentView::Applications(_) => self.visible_applications().len(),
            ContentView::Nodes => self.nodes.items().len(),
            ContentView::Events => self.events.items().len(),
            ContentView::Namespaces => self.namespaces.len(),
            ContentView::ClusterInfo
            | ContentView::ResourceUsage
            | ContentView::Placeholder(_) => 0,
        };
        len.min(MAX_TABLE_ROWS)
    }

    fn move_content_cursor(&mut self, delta: isize) {
        self.content_cursor = clamp_index(self.content_cursor, delta, self.content_len());
    }

    fn clamp_content_cursor(&mut self) {
        self.content_cursor = self
            .content_cursor
            .min(self.content_len().saturating_sub(1));
    }

    fn invalidate(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::Nodes => self.nodes.invalidate(),
            ResourceKind::Pods => self.pods.invalidate(),
            ResourceKind::Applications => self.applications.invalidate(),
            ResourceKind::Events => self.events.invalidate(),
            ResourceKind::ClusterMetrics => self.metrics.invalidate(),
        }
    }

    fn reset_controllers(&mut self) {
        self.nodes.reset();
        self.pods.reset();
        self.applications.reset();
        self.events.reset();
        self.metrics.reset();
    }

    /// Claims a refresh for the kind shown in the content pane, if due.
    fn refresh_visible(&mut self, now: Instant) -> Vec<AppCommand> {
        if !self.connection.connected_once() || self.fatal.is_some() {
            return Vec::new();
        }
        let Some(kind) = self.view.resource_kind() else {
            return Vec::new();
        };

        let claimed = match kind {
            ResourceKind::Nodes => claim_refresh(&mut self.nodes, now),
            ResourceKind::Pods => claim_refresh(&mut self.pods, now),
            ResourceKind::Applications => claim_refresh(&mut self.applications, now),
            ResourceKind::Events => claim_refresh(&mut *self.events, now),
            ResourceKind::ClusterMetrics => claim_refresh(&mut self.metrics, now),
        };
        if claimed {
            debug!("refreshing {}", kind.title());
            vec![AppCommand::Fetch {
                kind,
                epoch: self.epoch,
            }]
        } else {
            Vec::new()
        }
    }
}

fn default_namespaces() -> Vec<String> {
    DEFAULT_NAMESPACES.iter().map(|ns| ns.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::{
        App, AppCommand, AppMessage, ConfirmChoice, FetchPayload, FocusTarget, InputLayer,
        MAX_TABLE_ROWS, Overlay,
    };
    use crate::config::PeekConfig;
    use crate::connection::{ClusterError, ConnectionState};
    use crate::input::Action;
    use crate::model::{ContentView, NamespaceScope, NodeInfo, PodInfo, ResourceKind};
    use crate::resource::SnapshotStatus;
    use std::time::{Duration, Instant};

    fn new_app() -> App {
        App::new(
            &PeekConfig::default(),
            "prod".to_string(),
            vec!["dev".to_string(), "prod".to_string(), "staging".to_string()],
            NamespaceScope::Named("default".to_string()),
        )
    }

    fn connected_app(now: Instant) -> App {
        let mut app = new_app();
        let commands = app.begin_connection();
        assert_eq!(
            commands,
            vec![AppCommand::ValidateContext {
                context: "prod".to_string()
            }]
        );
        app.apply_message(
            AppMessage::ContextValidated {
                context: "prod".to_string(),
                result: Ok(vec!["default".to_string(), "kube-system".to_string()]),
            },
            now,
        );
        app
    }

    fn pod(name: &str) -> PodInfo {
        PodInfo {
            name: name.to_string(),
            namespace: "default".to_string(),
            status: "Running".to_string(),
            containers: vec!["main".to_string()],
            ..PodInfo::default()
        }
    }

    fn pods_view(now: Instant) -> App {
        let mut app = connected_app(now);
        app.handle_action(Action::ToggleSearch, now);
        for c in "pods".chars() {
            app.handle_action(Action::InputChar(c), now);
        }
        app.handle_action(Action::Down, now);
        let commands = app.handle_action(Action::Submit, now);
        assert_eq!(app.view(), &ContentView::Pods);
        assert_eq!(
            commands,
            vec![AppCommand::Fetch {
                kind: ResourceKind::Pods,
                epoch: app.epoch()
            }]
        );
        app.apply_message(
            AppMessage::Fetched {
                epoch: app.epoch(),
                scope: app.namespace_scope().clone(),
                payload: FetchPayload::Pods(Ok(vec![pod("web-1"), pod("api-1")])),
            },
            now,
        );
        app
    }

    #[test]
    fn startup_picker_cannot_be_cancelled_before_connecting() {
        let now = Instant::now();
        let mut app = new_app();
        assert_eq!(app.input_layer(), InputLayer::ContextPicker);

        app.handle_action(Action::Cancel, now);
        assert_eq!(app.input_layer(), InputLayer::ContextPicker);

        let Some(Overlay::ContextPicker(picker)) = app.overlay() else {
            panic!("context picker should be open");
        };
        assert_eq!(picker.selected().as_deref(), Some("prod"));
    }

    #[test]
    fn connecting_swallows_everything_but_quit() {
        let now = Instant::now();
        let mut app = new_app();
        app.begin_connection();
        assert!(matches!(app.connection_state(), ConnectionState::Connecting(_)));

        for action in [Action::Down, Action::Submit, Action::Cancel, Action::InputChar('x')] {
            assert!(app.handle_action(action, now).is_empty());
        }
        let Some(Overlay::ContextPicker(picker)) = app.overlay() else {
            panic!("context picker should stay open");
        };
        assert_eq!(picker.query(), "");
        assert_eq!(picker.selected().as_deref(), Some("prod"));

        app.handle_action(Action::Quit, now);
        assert!(!app.running());
    }

    #[test]
    fn successful_validation_commits_and_closes_picker() {
        let now = Instant::now();
        let app = connected_app(now);

        assert_eq!(app.context(), "prod");
        assert!(app.overlay().is_none());
        assert_eq!(app.namespaces(), ["default", "kube-system"]);
        assert_eq!(app.view(), &ContentView::ClusterInfo);
        assert_eq!(app.focus(), FocusTarget::Menu);
        assert_eq!(app.nav().selected(), Some("Overview"));
        assert_eq!(app.epoch(), 1);
        let titles = app
            .notifications()
            .visible()
            .map(|n| n.title.clone())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Context switched"]);
    }

    #[test]
    fn commit_requests_gateway_swap_before_fetching() {
        let now = Instant::now();
        let mut app = new_app();
        app.begin_connection();
        let commands = app.apply_message(
            AppMessage::ContextValidated {
                context: "prod".to_string(),
                result: Ok(Vec::new()),
            },
            now,
        );
        assert_eq!(
            commands,
            vec![
                AppCommand::CommitContext {
                    context: "prod".to_string()
                },
                AppCommand::Fetch {
                    kind: ResourceKind::ClusterMetrics,
                    epoch: 1
                },
            ]
        );
    }

    #[test]
    fn initial_failure_keeps_picker_open_with_error() {
        let now = Instant::now();
        let mut app = new_app();
        app.begin_connection();
        app.apply_message(
            AppMessage::ContextValidated {
                context: "prod".to_string(),
                result: Err(ClusterError::from_failure("prod", "connection refused")),
            },
            now,
        );

        assert_eq!(app.input_layer(), InputLayer::ContextPicker);
        let ConnectionState::Error(message) = app.connection_state() else {
            panic!("expected error state");
        };
        assert!(message.contains("Failed to connect to current context"));
        assert_eq!(app.namespaces().len(), 4);

        app.handle_action(Action::Cancel, now);
        assert_eq!(app.input_layer(), InputLayer::ContextPicker);
    }

    #[test]
    fn failed_switch_leaves_committed_context() {
        let now = Instant::now();
        let mut app = connected_app(now);
        app.handle_action(Action::OpenContextPicker, now);
        for c in "stag".chars() {
            app.handle_action(Action::InputChar(c), now);
        }
        let commands = app.handle_action(Action::Submit, now);
        assert_eq!(
            commands,
            vec![AppCommand::ValidateContext {
                context: "staging".to_string()
            }]
        );

        let commands = app.apply_message(
            AppMessage::ContextValidated {
                context: "staging".to_string(),
                result: Err(ClusterError::from_failure("staging", "401 Unauthorized")),
            },
            now,
        );
        assert!(commands.is_empty());
        assert_eq!(app.context(), "prod");
        assert_eq!(
            app.connection_state(),
            &ConnectionState::Error(
                "authentication failed for cluster 'staging': 401 Unauthorized".to_string()
            )
        );
        assert_eq!(app.input_layer(), InputLayer::ContextPicker);

        app.handle_action(Action::Cancel, now);
        assert!(app.overlay().is_none());
        assert_eq!(app.connection_state(), &ConnectionState::Idle);
    }

    #[test]
    fn switch_refreshes_namespaces_and_drops_stale_results() {
        let now = Instant::now();
        let mut app = connected_app(now);
        let old_epoch = app.epoch();
        app.handle_action(Action::OpenContextPicker, now);
        app.handle_action(Action::Up, now);
        app.handle_action(Action::Submit, now);
        app.apply_message(
            AppMessage::ContextValidated {
                context: "dev".to_string(),
                result: Ok(vec!["team-a".to_string()]),
            },
            now,
        );
        assert_eq!(app.context(), "dev");
        assert_eq!(app.namespaces(), ["team-a"]);
        assert_ne!(app.epoch(), old_epoch);

        app.apply_message(
            AppMessage::Fetched {
                epoch: old_epoch,
                scope: app.namespace_scope().clone(),
                payload: FetchPayload::Nodes(Ok(vec![NodeInfo::default()])),
            },
            now,
        );
        assert!(app.nodes().items().is_empty());
    }

    #[test]
    fn folder_toggle_keeps_menu_focus() {
        let now = Instant::now();
        let mut app = connected_app(now);
        for _ in 0..7 {
            app.handle_action(Action::Down, now);
        }
        let commands = app.handle_action(Action::Submit, now);
        assert!(commands.is_empty());
        assert_eq!(app.focus(), FocusTarget::Menu);
        assert!(app.nav().items()[3].expanded);
    }

    #[test]
    fn leaf_selection_focuses_content_and_fetches() {
        let now = Instant::now();
        let mut app = connected_app(now);
        app.handle_action(Action::Down, now);
        app.handle_action(Action::Down, now);
        app.handle_action(Action::Down, now);
        app.handle_action(Action::Down, now);
        let commands = app.handle_action(Action::Submit, now);

        assert_eq!(app.view(), &ContentView::Events);
        assert_eq!(app.focus(), FocusTarget::Content);
        assert_eq!(
            commands,
            vec![AppCommand::Fetch {
                kind: ResourceKind::Events,
                epoch: app.epoch()
            }]
        );
    }

    #[test]
    fn search_selection_exits_search() {
        let now = Instant::now();
        let app = pods_view(now);
        assert!(!app.nav().search_active());
        assert_eq!(app.nav().cursor(), 0);
        assert_eq!(app.focus(), FocusTarget::Content);
        assert_eq!(app.nav().selected(), Some("Workloads > Pods"));
    }

    #[test]
    fn focus_digit_leaves_search_query_alone() {
        let now = Instant::now();
        let mut app = connected_app(now);
        app.handle_action(Action::ToggleSearch, now);
        app.handle_action(Action::InputChar('p'), now);
        app.handle_action(Action::FocusContent, now);

        assert_eq!(app.focus(), FocusTarget::Content);
        assert_eq!(app.nav().search_query(), Some("p"));
        assert_eq!(app.input_layer(), InputLayer::Content);
    }

    #[test]
    fn tick_refreshes_only_when_due_and_not_in_flight() {
        let now = Instant::now();
        let mut app = pods_view(now);
        assert!(app.on_tick(now + Duration::from_secs(1)).is_empty());

        let later = now + Duration::from_secs(16);
        assert_eq!(
            app.on_tick(later),
            vec![AppCommand::Fetch {
                kind: ResourceKind::Pods,
                epoch: app.epoch()
            }]
        );
        assert!(app.on_tick(later + Duration::from_secs(1)).is_empty());
        assert_eq!(app.pods().items().len(), 2);
        assert_eq!(app.pods().status(), &SnapshotStatus::Ready);
        assert!(app.refreshing_visible());
    }

    #[test]
    fn failed_refresh_keeps_pods_visible() {
        let now = Instant::now();
        let mut app = pods_view(now);
        let later = now + Duration::from_secs(16);
        app.on_tick(later);
        app.apply_message(
            AppMessage::Fetched {
                epoch: app.epoch(),
                scope: app.namespace_scope().clone(),
                payload: FetchPayload::Pods(Err("timeout: deadline has elapsed".to_string())),
            },
            later,
        );
        assert_eq!(app.visible_pods().len(), 2);
        let state = app.kind_state(ResourceKind::Pods);
        assert!(state.has_data);
        assert_eq!(state.error, Some("timeout: deadline has elapsed"));
    }

    #[test]
    fn delete_without_confirming_does_nothing() {
        let now = Instant::now();
        let mut app = pods_view(now);
        app.handle_action(Action::DeletePod, now);
        let Some(Overlay::Confirmation(dialog)) = app.overlay() else {
            panic!("confirmation should be open");
        };
        assert_eq!(dialog.choice, ConfirmChoice::No);
        assert_eq!(dialog.title, "Delete Pod");

        let commands = app.handle_action(Action::Submit, now);
        assert!(commands.is_empty());
        assert!(app.overlay().is_none());
    }

    #[test]
    fn confirmed_delete_issues_one_call() {
        let now = Instant::now();
        let mut app = pods_view(now);
        app.handle_action(Action::DeletePod, now);
        app.handle_action(Action::Left, now);
        let commands = app.handle_action(Action::Submit, now);

        assert_eq!(
            commands,
            vec![AppCommand::DeletePod {
                namespace: "default".to_string(),
                pod: "api-1".to_string(),
                restart: false,
            }]
        );
        assert!(app.overlay().is_none());
    }

    #[test]
    fn pod_cursor_stays_on_drawn_rows() {
        let now = Instant::now();
        let mut app = pods_view(now);
        let pods = (0..60).map(|i| pod(&format!("pod-{i:02}"))).collect();
        app.apply_message(
            AppMessage::Fetched {
                epoch: app.epoch(),
                scope: app.namespace_scope().clone(),
                payload: FetchPayload::Pods(Ok(pods)),
            },
            now,
        );
        for _ in 0..55 {
            app.handle_action(Action::Down, now);
        }
        assert_eq!(app.content_cursor(), MAX_TABLE_ROWS - 1);

        app.handle_action(Action::DeletePod, now);
        let Some(Overlay::Confirmation(dialog)) = app.overlay() else {
            panic!("delete should ask for confirmation");
        };
        assert_eq!(
            dialog.message,
            "Are you sure you want to delete pod default/pod-49?"
        );
    }

    #[test]
    fn restart_confirmation_and_outcome() {
        let now = Instant::now();
        let mut app = pods_view(now);
        app.handle_action(Action::Down, now);
        app.handle_action(Action::RestartPod, now);
        app.handle_action(Action::ToggleChoice, now);
        let commands = app.handle_action(Action::Submit, now);
        assert_eq!(
            commands,
            vec![AppCommand::DeletePod {
                namespace: "default".to_string(),
                pod: "web-1".to_string(),
                restart: true,
            }]
        );

        let commands = app.apply_message(
            AppMessage::PodDeleted {
                namespace: "default".to_string(),
                pod: "web-1".to_string(),
                restart: true,
                result: Ok(()),
            },
            now,
        );
        assert_eq!(
            commands,
            vec![AppCommand::Fetch {
                kind: ResourceKind::Pods,
                epoch: app.epoch()
            }]
        );
        assert_eq!(
            app.notifications().visible().next().map(|n| n.title.as_str()),
            Some("Pod restarting")
        );
    }

    #[test]
    fn escape_cancels_confirmation() {
        let now = Instant::now();
        let mut app = pods_view(now);
        app.handle_action(Action::DeletePod, now);
        app.handle_action(Action::Left, now);
        assert!(app.handle_action(Action::Cancel, now).is_empty());
        assert!(app.overlay().is_none());
    }

    #[test]
    fn timeframe_validation_keeps_input_open() {
        let now = Instant::now();
        let mut app = connected_app(now);
        for _ in 0..4 {
            app.handle_action(Action::Down, now);
        }
        app.handle_action(Action::Submit, now);
        app.apply_message(
            AppMessage::Fetched {
                epoch: app.epoch(),
                scope: app.namespace_scope().clone(),
                payload: FetchPayload::Events(Ok(Vec::new())),
            },
            now,
        );

        app.handle_action(Action::OpenTimeframe, now);
        assert_eq!(app.input_layer(), InputLayer::TimeframeInput);
        app.handle_action(Action::Backspace, now);
        app.handle_action(Action::Backspace, now);
        app.handle_action(Action::InputChar('0'), now);
        app.handle_action(Action::InputChar('x'), now);
        let commands = app.handle_action(Action::Submit, now);

        assert!(commands.is_empty());
        assert_eq!(app.input_layer(), InputLayer::TimeframeInput);
        assert_eq!(app.events().timeframe_minutes(), 10);
        assert_eq!(
            app.notifications().visible().next().map(|n| n.body.as_str()),
            Some("must be greater than 0")
        );

        app.handle_action(Action::Backspace, now);
        app.handle_action(Action::InputChar('4'), now);
        app.handle_action(Action::InputChar('5'), now);
        let commands = app.handle_action(Action::Submit, now);
        assert!(app.overlay().is_none());
        assert_eq!(app.events().timeframe_minutes(), 45);
        assert_eq!(
            commands,
            vec![AppCommand::Fetch {
                kind: ResourceKind::Events,
                epoch: app.epoch()
            }]
        );
    }

    #[test]
    fn timeframe_change_during_fetch_refetches_on_next_tick() {
        let start = Instant::now();
        let mut app = connected_app(start);
        for _ in 0..4 {
            app.handle_action(Action::Down, start);
        }
        app.handle_action(Action::Submit, start);
        let epoch = app.epoch();
        let events_fetched = || AppMessage::Fetched {
            epoch,
            scope: NamespaceScope::All,
            payload: FetchPayload::Events(Ok(Vec::new())),
        };
        app.apply_message(events_fetched(), start);

        let later = start + Duration::from_secs(16);
        let refetch = vec![AppCommand::Fetch {
            kind: ResourceKind::Events,
            epoch,
        }];
        assert_eq!(app.on_tick(later), refetch);

        app.handle_action(Action::OpenTimeframe, later);
        app.handle_action(Action::Backspace, later);
        app.handle_action(Action::Backspace, later);
        app.handle_action(Action::InputChar('4'), later);
        app.handle_action(Action::InputChar('5'), later);
        assert!(app.handle_action(Action::Submit, later).is_empty());
        assert_eq!(app.events().timeframe_minutes(), 45);

        app.apply_message(events_fetched(), later);
        let next = later + Duration::from_secs(1);
        assert_eq!(app.on_tick(next), refetch);
    }

    #[test]
    fn timeframe_only_opens_on_events_view() {
        let now = Instant::now();
        let mut app = pods_view(now);
        app.handle_action(Action::OpenTimeframe, now);
        assert!(app.overlay().is_none());
    }

    #[test]
    fn overlay_consumes_digits_before_focus_keys() {
        let now = Instant::now();
        let mut app = connected_app(now);
        app.handle_action(Action::OpenNamespacePicker, now);
        assert_eq!(app.input_layer(), InputLayer::NamespacePicker);
        app.handle_action(Action::FocusContent, now);
        assert_eq!(app.focus(), FocusTarget::Menu);
        assert_eq!(app.input_layer(), InputLayer::NamespacePicker);
    }

    #[test]
    fn namespace_change_resets_namespaced_kinds() {
        let now = Instant::now();
        let mut app = pods_view(now);
        let commands = app.handle_action(Action::OpenNamespacePicker, now);
        assert_eq!(commands, vec![AppCommand::LoadNamespaces { epoch: app.epoch() }]);
        for c in "kube-s".chars() {
            app.handle_action(Action::InputChar(c), now);
        }
        let commands = app.handle_action(Action::Submit, now);

        assert_eq!(
            app.namespace_scope(),
            &NamespaceScope::Named("kube-system".to_string())
        );
        assert!(app.pods().items().is_empty());
        assert_eq!(
            commands,
            vec![AppCommand::Fetch {
                kind: ResourceKind::Pods,
                epoch: app.epoch()
            }]
        );
        assert_eq!(
            app.notifications().visible().next().map(|n| n.title.as_str()),
            Some("Namespace changed")
        );

        app.apply_message(
            AppMessage::Fetched {
                epoch: app.epoch(),
                scope: NamespaceScope::Named("default".to_string()),
                payload: FetchPayload::Pods(Ok(vec![pod("stale-1")])),
            },
            now,
        );
        assert!(app.pods().items().is_empty());
        assert!(app.pods().is_initial_load());
    }

    #[test]
    fn all_namespaces_entry_comes_first() {
        let now = Instant::now();
        let mut app = connected_app(now);
        app.handle_action(Action::OpenNamespacePicker, now);
        let Some(Overlay::NamespacePicker(picker)) = app.overlay() else {
            panic!("namespace picker should be open");
        };
        assert_eq!(picker.filtered()[0], "All namespaces");
        assert_eq!(picker.selected().as_deref(), Some("default"));

        app.handle_action(Action::Up, now);
        app.handle_action(Action::Submit, now);
        assert_eq!(app.namespace_scope(), &NamespaceScope::All);
    }

    #[test]
    fn logs_viewer_follows_and_cancels() {
        let now = Instant::now();
        let mut app = pods_view(now);
        app.set_viewer_height(2);
        let commands = app.handle_action(Action::ShowLogs, now);
        let [AppCommand::StreamLogs { stream, pod, .. }] = commands.as_slice() else {
            panic!("expected a log stream command");
        };
        assert_eq!(pod, "api-1");
        let stream = *stream;

        app.apply_message(
            AppMessage::LogLines {
                stream: stream + 100,
                lines: vec!["stray".to_string()],
            },
            now,
        );
        app.apply_message(
            AppMessage::LogLines {
                stream,
                lines: (0..5).map(|i| format!("line {i}")).collect(),
            },
            now,
        );
        let Some(Overlay::Logs(viewer)) = app.overlay() else {
            panic!("logs should be open");
        };
        assert_eq!(viewer.lines().len(), 5);
        assert_eq!(viewer.scroll(), 3);
        assert!(viewer.following());

        app.handle_action(Action::Up, now);
        let Some(Overlay::Logs(viewer)) = app.overlay() else {
            panic!("logs should be open");
        };
        assert!(!viewer.following());
        assert_eq!(viewer.scroll(), 2);

        let commands = app.handle_action(Action::Cancel, now);
        assert_eq!(commands, vec![AppCommand::CancelViewer]);
        assert!(app.overlay().is_none());
    }

    #[test]
    fn logs_are_capped() {
        let now = Instant::now();
        let mut app = pods_view(now);
        let commands = app.handle_action(Action::ShowLogs, now);
        let [AppCommand::StreamLogs { stream, .. }] = commands.as_slice() else {
            panic!("expected a log stream command");
        };
        let stream = *stream;
        app.apply_message(
            AppMessage::LogLines {
                stream,
                lines: (0..1_200).map(|i| i.to_string()).collect(),
            },
            now,
        );
        let Some(Overlay::Logs(viewer)) = app.overlay() else {
            panic!("logs should be open");
        };
        assert_eq!(viewer.lines().len(), 1_000);
        assert_eq!(viewer.lines().front().map(String::as_str), Some("200"));
    }

    #[test]
    fn yaml_viewer_loads_and_closes() {
        let now = Instant::now();
        let mut app = pods_view(now);
        let commands = app.handle_action(Action::ShowYaml, now);
        let [AppCommand::LoadManifest { request, .. }] = commands.as_slice() else {
            panic!("expected a manifest request");
        };
        let request = *request;
        app.apply_message(
            AppMessage::Manifest {
                request,
                result: Ok("kind: Pod\n".to_string()),
            },
            now,
        );
        let Some(Overlay::Yaml(viewer)) = app.overlay() else {
            panic!("yaml viewer should be open");
        };
        assert_eq!(viewer.content(), Some("kind: Pod\n"));
        assert_eq!(
            app.handle_action(Action::Cancel, now),
            vec![AppCommand::CancelViewer]
        );
    }

    #[test]
    fn pod_filter_narrows_rows() {
        let now = Instant::now();
        let mut app = pods_view(now);
        app.handle_action(Action::StartPodFilter, now);
        assert_eq!(app.input_layer(), InputLayer::PodFilter);
        for c in "web".chars() {
            app.handle_action(Action::InputChar(c), now);
        }
        assert_eq!(app.visible_pods().len(), 1);
        app.handle_action(Action::Submit, now);
        assert_eq!(app.input_layer(), InputLayer::Content);
        assert_eq!(app.visible_pods().len(), 1);

        app.handle_action(Action::Cancel, now);
        assert_eq!(app.visible_pods().len(), 2);
    }

    #[test]
    fn fatal_error_blocks_input_except_quit() {
        let now = Instant::now();
        let mut app = new_app();
        app.set_fatal("no kubeconfig found");
        assert!(app.begin_connection().is_empty());
        assert_eq!(app.input_layer(), InputLayer::Fatal);
        assert!(app.handle_action(Action::Submit, now).is_empty());
        app.handle_action(Action::Quit, now);
        assert!(!app.running());
    }

    #[test]
    fn notifications_expire_on_tick() {
        let now = Instant::now();
        let mut app = connected_app(now);
        assert_eq!(app.notifications().len(), 1);
        app.on_tick(now + Duration::from_secs(6));
        assert!(app.notifications().is_empty());
    }
}
