use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Wrap,
};
use std::time::Instant;

use crate::app::{
    ALL_NAMESPACES_LABEL, App, ConfirmChoice, ConfirmationDialog, FocusTarget, InputLayer,
    LogsViewer, MAX_TABLE_ROWS, Overlay, Picker, YamlViewer,
};
use crate::connection::ConnectionState;
use crate::k8s::{format_bytes, format_cpu_millicores};
use crate::model::{ContentView, NamespaceScope};
use crate::notify::{Severity, time_ago};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const INFO: Color = Color::Rgb(147, 197, 253);
const HIGHLIGHT: Color = Color::Rgb(24, 36, 58);
const GAUGE_EMPTY: Color = Color::Rgb(30, 41, 59);

const MENU_WIDTH: u16 = 35;
const NOTIFICATION_WIDTH: u16 = 44;
const NOTIFICATION_HEIGHT: u16 = 4;

pub fn render(frame: &mut Frame, app: &mut App) {
    if let Some(message) = app.fatal() {
        render_fatal(frame, message);
        return;
    }

    let viewer = viewer_rect(frame.area());
    app.set_viewer_height(viewer.height.saturating_sub(2) as usize);
    let app = &*app;

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(MENU_WIDTH), Constraint::Min(20)])
        .split(root[1]);
    render_menu(frame, body[0], app);
    render_content(frame, body[1], app);
    render_footer(frame, root[2], app);

    match app.overlay() {
        Some(Overlay::ContextPicker(picker)) => render_context_picker(frame, app, picker),
        Some(Overlay::NamespacePicker(picker)) => render_namespace_picker(frame, app, picker),
        Some(Overlay::TimeframeInput(input)) => render_timeframe_input(frame, input),
        Some(Overlay::Confirmation(dialog)) => render_confirmation(frame, dialog),
        Some(Overlay::Logs(logs)) => render_logs(frame, viewer, logs),
        Some(Overlay::Yaml(yaml)) => render_yaml(frame, viewer, yaml),
        None => {}
    }

    render_notifications(frame, app, Instant::now());
}

fn render_fatal(frame: &mut Frame, message: &str) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(BG)), area);

    let mut lines = vec![
        Line::styled(
            "Configuration error",
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
    ];
    lines.extend(
        message
            .lines()
            .map(|line| Line::styled(line.to_string(), Style::default().fg(Color::White))),
    );
    lines.push(Line::from(""));
    lines.push(Line::styled("Press Ctrl+Q to quit", Style::default().fg(MUTED)));

    let panel = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("peek")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ERROR))
                .style(Style::default().bg(PANEL)),
        );
    frame.render_widget(panel, centered_rect(70, 40, area));
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(" Context: ", Style::default().fg(MUTED)),
        Span::styled(
            app.context().to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  Namespace: ", Style::default().fg(MUTED)),
        Span::styled(
            app.namespace_scope().to_string(),
            Style::default().fg(Color::White),
        ),
    ];
    if app.refreshing_visible() {
        spans.push(Span::styled(" ●", Style::default().fg(WARN)));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn pane_block(title: impl Into<String>, focused: bool) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL))
}

fn render_menu(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus() == FocusTarget::Menu && app.overlay().is_none();
    let block = pane_block("Kubernetes Resources", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let nav = app.nav();
    let mut list_area = inner;
    if let Some(query) = nav.search_query() {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Search: ", Style::default().fg(MUTED)),
                Span::styled(format!("{query}│"), Style::default().fg(WARN)),
            ])),
            split[0],
        );
        list_area = split[1];
    }

    let rows = nav.visible();
    let selected = nav.selected();
    let height = list_area.height.max(1) as usize;
    let offset = nav.cursor().saturating_sub(height.saturating_sub(1));

    let lines = rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, row)| {
            let marker = if row.is_folder {
                if row.expanded || nav.search_active() {
                    "▼ "
                } else {
                    "▶ "
                }
            } else {
                "  "
            };
            let indent = "  ".repeat(row.level);
            let is_selected = !row.is_folder && selected == Some(row.id().as_str());

            let mut style = if row.is_folder {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else if is_selected {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(Color::White)
            };
            if index == nav.cursor() && focused {
                style = style.bg(HIGHLIGHT).add_modifier(Modifier::BOLD);
            }
            Line::styled(format!("{indent}{marker}{}", row.name), style)
        })
        .collect::<Vec<_>>();

    frame.render_widget(Paragraph::new(lines), list_area);
}

fn render_content(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus() == FocusTarget::Content && app.overlay().is_none();
    let view = app.view();
    let mut title = view.title();
    if *view == ContentView::Events {
        title = format!("{title} (last {} min)", app.events().timeframe_minutes());
    }
    let block = pane_block(title, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut body = inner;
    if let Some(kind) = view.resource_kind() {
        let state = app.kind_state(kind);
        if !state.has_data {
            let (text, color) = match state.error {
                Some(error) => (format!("Failed to load {}:\n{error}", kind.title()), ERROR),
                None => ("Loading…".to_string(), MUTED),
            };
            frame.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: false })
                    .style(Style::default().fg(color)),
                centered_rect(80, 30, inner),
            );
            return;
        }

        if let Some(error) = state.error {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(1)])
                .split(inner);
            frame.render_widget(
                Paragraph::new(compact_text(
                    &format!("⚠ refresh failed: {}", error.replace('\n', " ")),
                    split[0].width as usize,
                ))
                .style(Style::default().fg(Color::Black).bg(WARN)),
                split[0],
            );
            body = split[1];
        }
    }

    match view {
        ContentView::ClusterInfo => render_cluster_overview(frame, body, app),
        ContentView::ResourceUsage => render_resource_usage(frame, body, app),
        ContentView::Namespaces => render_namespaces(frame, body, app, focused),
        ContentView::Events => render_events(frame, body, app, focused),
        ContentView::Applications(_) => render_applications(frame, body, app, focused),
        ContentView::Nodes => render_nodes(frame, body, app, focused),
        ContentView::Pods => render_pods(frame, body, app, focused),
        ContentView::Placeholder(id) => {
            let text = format!("{id}\n\nNothing to show for this resource yet.");
            frame.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(MUTED)),
                centered_rect(80, 30, body),
            );
        }
    }
}

/// Renders up to `MAX_TABLE_ROWS` rows plus a trailer naming the rest.
fn render_table(
    frame: &mut Frame,
    area: Rect,
    headers: &[&str],
    widths: &[Constraint],
    rows: Vec<Row<'static>>,
    selected: Option<usize>,
) {
    let total = rows.len();
    let mut rows = rows.into_iter().take(MAX_TABLE_ROWS).collect::<Vec<_>>();
    if total > MAX_TABLE_ROWS {
        rows.push(
            Row::new(vec![Cell::from(format!(
                "... and {} more",
                total - MAX_TABLE_ROWS
            ))])
            .style(Style::default().fg(MUTED)),
        );
    }

    let header = Row::new(headers.iter().map(|header| {
        Cell::from(header.to_string()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let table = Table::new(rows, widths.to_vec())
        .header(header)
        .column_spacing(1)
        .row_highlight_style(Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD))
        .highlight_symbol("▸ ");

    let mut state = TableState::default();
    state.select(selected.filter(|index| *index < MAX_TABLE_ROWS));
    frame.render_stateful_widget(table, area, &mut state);
}

fn selection(app: &App, focused: bool) -> Option<usize> {
    focused.then_some(app.content_cursor())
}

fn render_pods(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let mut table_area = area;
    if let Some(filter) = app.pod_filter() {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(area);
        let cursor = if filter.typing { "│" } else { "" };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Filter: ", Style::default().fg(MUTED)),
                Span::styled(format!("{}{cursor}", filter.query), Style::default().fg(WARN)),
            ])),
            split[0],
        );
        table_area = split[1];
    }

    let rows = app
        .visible_pods()
        .into_iter()
        .map(|pod| {
            Row::new(vec![
                Cell::from(pod.name.clone()),
                Cell::from(pod.namespace.clone()).style(Style::default().fg(MUTED)),
                Cell::from(pod.status.clone()).style(Style::default().fg(status_color(&pod.status))),
                Cell::from(pod.ready()),
                Cell::from(pod.restarts.to_string()),
                Cell::from(pod.age.clone()),
                Cell::from(pod.node.clone()).style(Style::default().fg(MUTED)),
                Cell::from(pod.ip.clone()).style(Style::default().fg(MUTED)),
            ])
            .style(Style::default().fg(Color::White))
        })
        .collect();

    render_table(
        frame,
        table_area,
        &["NAME", "NAMESPACE", "STATUS", "READY", "RESTARTS", "AGE", "NODE", "IP"],
        &[
            Constraint::Min(24),
            Constraint::Length(16),
            Constraint::Length(18),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Length(16),
            Constraint::Length(15),
        ],
        rows,
        selection(app, focused),
    );
}

fn render_applications(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let rows = app
        .visible_applications()
        .into_iter()
        .map(|application| {
            Row::new(vec![
                Cell::from(application.name.clone()),
                Cell::from(application.kind.title()),
                Cell::from(application.namespace.clone()).style(Style::default().fg(MUTED)),
                Cell::from(application.status.clone())
                    .style(Style::default().fg(status_color(&application.status))),
                Cell::from(format!(
                    "{}/{}",
                    application.ready_replicas, application.replicas
                )),
                Cell::from(application.age.clone()),
            ])
            .style(Style::default().fg(Color::White))
        })
        .collect();

    render_table(
        frame,
        area,
        &["NAME", "TYPE", "NAMESPACE", "STATUS", "READY", "AGE"],
        &[
            Constraint::Min(24),
            Constraint::Length(12),
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Length(7),
            Constraint::Length(5),
        ],
        rows,
        selection(app, focused),
    );
}

fn render_nodes(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let rows = app
        .nodes()
        .items()
        .iter()
        .map(|node| {
            Row::new(vec![
                Cell::from(node.name.clone()),
                Cell::from(node.status()).style(Style::default().fg(status_color(node.status()))),
                Cell::from(node.roles.join(",")),
                Cell::from(node.age.clone()),
                Cell::from(node.version.clone()),
                Cell::from(format!("{}/{}", node.os, node.architecture))
                    .style(Style::default().fg(MUTED)),
                Cell::from(node.cpu_capacity.clone()),
                Cell::from(node.memory_capacity.clone()),
            ])
            .style(Style::default().fg(Color::White))
        })
        .collect();

    render_table(
        frame,
        area,
        &["NAME", "STATUS", "ROLES", "AGE", "VERSION", "OS/ARCH", "CPU", "MEMORY"],
        &[
            Constraint::Min(20),
            Constraint::Length(9),
            Constraint::Length(16),
            Constraint::Length(5),
            Constraint::Length(12),
            Constraint::Length(13),
            Constraint::Length(5),
            Constraint::Length(9),
        ],
        rows,
        selection(app, focused),
    );
}

fn render_events(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let events = app.events().items();
    if events.is_empty() {
        frame.render_widget(
            Paragraph::new(format!(
                "No events in the last {} minutes (press t to change)",
                app.events().timeframe_minutes()
            ))
            .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    let message_width = area.width.saturating_sub(70).max(20) as usize;
    let rows = events
        .iter()
        .map(|event| {
            Row::new(vec![
                Cell::from(event.age.clone()),
                Cell::from(event.event_type.clone())
                    .style(Style::default().fg(event_type_color(&event.event_type))),
                Cell::from(event.reason.clone()),
                Cell::from(compact_text(&event.object, 30)),
                Cell::from(compact_text(&event.message, message_width)),
                Cell::from(event.count.to_string()),
                Cell::from(event.namespace.clone()).style(Style::default().fg(MUTED)),
            ])
            .style(Style::default().fg(Color::White))
        })
        .collect();

    render_table(
        frame,
        area,
        &["AGE", "TYPE", "REASON", "OBJECT", "MESSAGE", "COUNT", "NAMESPACE"],
        &[
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Length(18),
            Constraint::Length(30),
            Constraint::Min(20),
            Constraint::Length(5),
            Constraint::Length(16),
        ],
        rows,
        selection(app, focused),
    );
}

fn render_namespaces(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let active = app.namespace_scope().namespace();
    let rows = app
        .namespaces()
        .iter()
        .map(|namespace| {
            let current = active == Some(namespace.as_str());
            let style = if current {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(Color::White)
            };
            let marker = if current { "◉" } else { " " };
            Row::new(vec![Cell::from(marker), Cell::from(namespace.clone())]).style(style)
        })
        .collect::<Vec<Row>>();

    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new("No namespaces loaded (Ctrl+N to refresh)")
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    render_table(
        frame,
        area,
        &["", "NAMESPACE"],
        &[Constraint::Length(1), Constraint::Min(10)],
        rows,
        selection(app, focused),
    );
}

fn render_cluster_overview(frame: &mut Frame, area: Rect, app: &App) {
    let Some(metrics) = app.metrics().items().first() else {
        return;
    };
    let nodes = &metrics.nodes;
    let pods = &metrics.pods;

    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
        ])
        .split(area);

    let summary = vec![
        Line::from(vec![
            Span::styled("Nodes  ", Style::default().fg(MUTED)),
            Span::styled(nodes.total.to_string(), Style::default().fg(Color::White)),
            Span::styled(format!("  ready {}", nodes.ready), Style::default().fg(ACCENT)),
            Span::styled(
                format!("  not ready {}", nodes.not_ready),
                Style::default().fg(if nodes.not_ready > 0 { ERROR } else { MUTED }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Pods   ", Style::default().fg(MUTED)),
            Span::styled(pods.total.to_string(), Style::default().fg(Color::White)),
            Span::styled(format!("  running {}", pods.running), Style::default().fg(ACCENT)),
            Span::styled(format!("  pending {}", pods.pending), Style::default().fg(WARN)),
            Span::styled(format!("  failed {}", pods.failed), Style::default().fg(ERROR)),
            Span::styled(
                format!("  succeeded {}  unknown {}", pods.succeeded, pods.unknown),
                Style::default().fg(MUTED),
            ),
        ]),
    ];
    frame.render_widget(Paragraph::new(summary), split[0]);

    render_gauge(
        frame,
        split[2],
        &Meter {
            label: "Nodes ready".to_string(),
            value: format!("{}/{}", nodes.ready, nodes.total),
            percent: percent(nodes.ready as u64, nodes.total as u64),
        },
    );
    render_gauge(
        frame,
        split[3],
        &Meter {
            label: "Pods running".to_string(),
            value: format!("{}/{}", pods.running, pods.total),
            percent: percent(pods.running as u64, pods.total as u64),
        },
    );

    let events_block = Block::default()
        .title("Recent warnings")
        .borders(Borders::TOP)
        .border_style(Style::default().fg(MUTED));
    let events_area = events_block.inner(split[4]);
    frame.render_widget(events_block, split[4]);

    if metrics.recent_events.is_empty() {
        frame.render_widget(
            Paragraph::new("No recent warnings").style(Style::default().fg(MUTED)),
            events_area,
        );
        return;
    }

    let message_width = events_area.width.saturating_sub(40).max(20) as usize;
    let rows = metrics
        .recent_events
        .iter()
        .map(|event| {
            Row::new(vec![
                Cell::from(event.age.clone()),
                Cell::from(event.reason.clone())
                    .style(Style::default().fg(event_type_color(&event.event_type))),
                Cell::from(compact_text(&event.object, 28)),
                Cell::from(compact_text(&event.message, message_width)),
            ])
            .style(Style::default().fg(Color::White))
        })
        .collect();
    render_table(
        frame,
        events_area,
        &["AGE", "REASON", "OBJECT", "MESSAGE"],
        &[
            Constraint::Length(5),
            Constraint::Length(18),
            Constraint::Length(28),
            Constraint::Min(20),
        ],
        rows,
        None,
    );
}

fn render_resource_usage(frame: &mut Frame, area: Rect, app: &App) {
    let Some(metrics) = app.metrics().items().first() else {
        return;
    };
    let nodes = &metrics.nodes;

    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(format!(
            "Allocatable capacity across {} node(s)",
            nodes.total
        ))
        .style(Style::default().fg(MUTED)),
        split[0],
    );
    render_gauge(
        frame,
        split[2],
        &Meter {
            label: "CPU".to_string(),
            value: format!(
                "{} / {}",
                format_cpu_millicores(nodes.cpu_allocatable_millicores),
                format_cpu_millicores(nodes.cpu_capacity_millicores)
            ),
            percent: percent(
                nodes.cpu_allocatable_millicores,
                nodes.cpu_capacity_millicores,
            ),
        },
    );
    render_gauge(
        frame,
        split[3],
        &Meter {
            label: "Memory".to_string(),
            value: format!(
                "{} / {}",
                format_bytes(nodes.memory_allocatable_bytes),
                format_bytes(nodes.memory_capacity_bytes)
            ),
            percent: percent(nodes.memory_allocatable_bytes, nodes.memory_capacity_bytes),
        },
    );
}

struct Meter {
    label: String,
    value: String,
    percent: u64,
}

fn percent(part: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (part.saturating_mul(100) / total).min(100)
}

fn gauge_color(percent: u64) -> Color {
    if percent >= 80 {
        ACCENT
    } else if percent >= 55 {
        WARN
    } else {
        ERROR
    }
}

fn render_gauge(frame: &mut Frame, area: Rect, meter: &Meter) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let split = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let label = format!("{} {}", meter.label, meter.value);
    frame.render_widget(
        Paragraph::new(compact_text(
            &label,
            split[0].width.saturating_sub(1).max(1) as usize,
        ))
        .style(Style::default().fg(Color::White)),
        split[0],
    );

    let percent = meter.percent.min(100);
    let gauge = Gauge::default()
        .gauge_style(
            Style::default()
                .fg(gauge_color(percent))
                .bg(GAUGE_EMPTY)
                .add_modifier(Modifier::BOLD),
        )
        .percent(percent as u16)
        .label(Span::styled(
            format!("{percent}%"),
            Style::default().fg(Color::White),
        ));
    frame.render_widget(gauge, split[1]);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let hints: &[(&str, &str)] = match app.input_layer() {
        InputLayer::Fatal => &[("Ctrl+Q", "quit")],
        InputLayer::ContextPicker => &[
            ("↑↓", "move"),
            ("type", "filter"),
            ("Enter", "connect"),
            ("Esc", "close"),
        ],
        InputLayer::NamespacePicker => &[
            ("↑↓", "move"),
            ("type", "filter"),
            ("Enter", "apply"),
            ("Esc", "close"),
        ],
        InputLayer::TimeframeInput => &[("0-9", "minutes"), ("Enter", "apply"), ("Esc", "cancel")],
        InputLayer::Confirmation => &[("←→/Tab", "choose"), ("Enter", "confirm"), ("Esc", "cancel")],
        InputLayer::Logs => &[
            ("↑↓", "scroll"),
            ("PgUp/PgDn", "page"),
            ("g/G", "top/bottom"),
            ("f", "follow"),
            ("Esc", "close"),
        ],
        InputLayer::Yaml => &[
            ("↑↓", "scroll"),
            ("PgUp/PgDn", "page"),
            ("g/G", "top/bottom"),
            ("Esc", "close"),
        ],
        InputLayer::MenuSearch => &[("type", "search"), ("Enter", "select"), ("Esc", "done")],
        InputLayer::PodFilter => &[("type", "filter"), ("Enter", "keep"), ("Esc", "clear")],
        InputLayer::Menu => &[
            ("↑↓", "move"),
            ("Enter", "select"),
            ("/", "search"),
            ("2", "content"),
            ("Ctrl+K", "context"),
            ("Ctrl+N", "namespace"),
            ("q", "quit"),
        ],
        InputLayer::Content => match app.view() {
            ContentView::Pods => &[
                ("↑↓", "move"),
                ("l", "logs"),
                ("y", "yaml"),
                ("d", "delete"),
                ("r", "restart"),
                ("/", "filter"),
                ("1", "menu"),
                ("F5", "refresh"),
            ],
            ContentView::Events => &[
                ("↑↓", "move"),
                ("t", "timeframe"),
                ("1", "menu"),
                ("F5", "refresh"),
                ("q", "quit"),
            ],
            _ => &[
                ("↑↓", "move"),
                ("Esc", "menu"),
                ("F5", "refresh"),
                ("Ctrl+N", "namespace"),
                ("q", "quit"),
            ],
        },
    };

    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, label) in hints {
        spans.push(Span::styled(
            format!(" {key} "),
            Style::default().fg(BG).bg(ACCENT),
        ));
        spans.push(Span::styled(
            format!(" {label}  "),
            Style::default().fg(MUTED),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn picker_lines(picker: &Picker, current: &str, height: usize) -> Vec<Line<'static>> {
    let entries = picker.filtered();
    if entries.is_empty() {
        return vec![Line::styled("No matches", Style::default().fg(MUTED))];
    }

    let height = height.max(1);
    let offset = picker.cursor().saturating_sub(height - 1);
    entries
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, entry)| {
            let is_current = entry == current;
            let text = if is_current {
                format!("◉ {entry} (current)")
            } else {
                format!("  {entry}")
            };
            let mut style = if is_current {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(Color::White)
            };
            if index == picker.cursor() {
                style = style.bg(HIGHLIGHT).add_modifier(Modifier::BOLD);
            }
            Line::styled(text, style)
        })
        .collect()
}

fn render_picker(
    frame: &mut Frame,
    title: &str,
    picker: &Picker,
    current: &str,
    status: Option<Line<'static>>,
) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);
    let block = pane_block(title, true);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let status_height = if status.is_some() { 3 } else { 0 };
    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(status_height),
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Filter: ", Style::default().fg(MUTED)),
            Span::styled(format!("{}│", picker.query()), Style::default().fg(WARN)),
        ])),
        split[0],
    );
    frame.render_widget(
        Paragraph::new(picker_lines(picker, current, split[1].height as usize)),
        split[1],
    );
    if let Some(status) = status {
        frame.render_widget(Paragraph::new(status).wrap(Wrap { trim: false }), split[2]);
    }
}

fn render_context_picker(frame: &mut Frame, app: &App, picker: &Picker) {
    let status = match app.connection_state() {
        ConnectionState::Idle => None,
        ConnectionState::Connecting(context) => Some(Line::styled(
            format!("Connecting to {context}…"),
            Style::default().fg(WARN),
        )),
        ConnectionState::Error(error) => Some(Line::styled(
            error.replace('\n', " "),
            Style::default().fg(ERROR),
        )),
    };
    render_picker(frame, "Switch Context", picker, app.context(), status);
}

fn render_namespace_picker(frame: &mut Frame, app: &App, picker: &Picker) {
    let current = match app.namespace_scope() {
        NamespaceScope::All => ALL_NAMESPACES_LABEL,
        NamespaceScope::Named(namespace) => namespace.as_str(),
    };
    render_picker(frame, "Select Namespace", picker, current, None);
}

fn render_timeframe_input(frame: &mut Frame, input: &str) {
    let area = fixed_rect(50, 6, frame.area());
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(vec![
            Span::styled("Minutes: ", Style::default().fg(MUTED)),
            Span::styled(format!("{input}│"), Style::default().fg(WARN)),
        ]),
        Line::from(""),
        Line::styled(
            "1-1440 minutes. Enter apply, Esc cancel.",
            Style::default().fg(MUTED),
        ),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(pane_block("Events Timeframe", true)),
        area,
    );
}

fn render_confirmation(frame: &mut Frame, dialog: &ConfirmationDialog) {
    let area = fixed_rect(60, 8, frame.area());
    frame.render_widget(Clear, area);

    let button = |label: &str, active: bool| {
        if active {
            Span::styled(
                format!("[ {label} ]"),
                Style::default().fg(BG).bg(WARN).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!("  {label}  "), Style::default().fg(MUTED))
        }
    };
    let lines = vec![
        Line::styled(dialog.message.clone(), Style::default().fg(Color::White)),
        Line::from(""),
        Line::from(vec![
            button("Yes", dialog.choice == ConfirmChoice::Yes),
            Span::raw("    "),
            button("No", dialog.choice == ConfirmChoice::No),
        ])
        .alignment(Alignment::Center),
    ];

    let block = Block::default()
        .title(dialog.title.clone())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(WARN))
        .style(Style::default().bg(PANEL));
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

fn render_logs(frame: &mut Frame, area: Rect, viewer: &LogsViewer) {
    frame.render_widget(Clear, area);

    let mut title = format!("Logs: {}/{}", viewer.namespace, viewer.pod);
    if let Some(container) = viewer.container.as_deref() {
        title.push_str(&format!(" [{container}]"));
    }
    title.push_str(if viewer.following() {
        " (following)"
    } else {
        " (paused)"
    });
    let block = pane_block(title, true);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if viewer.loading() {
        frame.render_widget(
            Paragraph::new("Loading logs…").style(Style::default().fg(MUTED)),
            inner,
        );
        return;
    }

    let height = inner.height as usize;
    let mut lines = viewer
        .lines()
        .iter()
        .skip(viewer.scroll())
        .take(height)
        .map(|line| Line::styled(line.clone(), Style::default().fg(log_line_color(line))))
        .collect::<Vec<_>>();
    if viewer.ended() && lines.len() < height {
        lines.push(match viewer.error() {
            Some(error) => Line::styled(format!("[stream error] {error}"), Style::default().fg(ERROR)),
            None => Line::styled("[stream ended]", Style::default().fg(MUTED)),
        });
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_yaml(frame: &mut Frame, area: Rect, viewer: &YamlViewer) {
    frame.render_widget(Clear, area);
    let block = pane_block(format!("YAML: {}/{}", viewer.namespace, viewer.pod), true);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = match (viewer.content(), viewer.error()) {
        (_, Some(error)) => Text::styled(error.to_string(), Style::default().fg(ERROR)),
        (Some(content), None) => Text::from(
            content
                .lines()
                .skip(viewer.scroll())
                .take(inner.height as usize)
                .map(highlight_yaml_line)
                .collect::<Vec<_>>(),
        ),
        (None, None) => Text::styled("Loading manifest…", Style::default().fg(MUTED)),
    };
    frame.render_widget(Paragraph::new(text), inner);
}

fn render_notifications(frame: &mut Frame, app: &App, now: Instant) {
    let area = frame.area();
    if area.width < NOTIFICATION_WIDTH + 2 {
        return;
    }

    let x = area.x + area.width - NOTIFICATION_WIDTH - 1;
    let mut y = area.y + 1;
    for notification in app.notifications().visible() {
        if y + NOTIFICATION_HEIGHT > area.y + area.height {
            break;
        }
        let slot = Rect::new(x, y, NOTIFICATION_WIDTH, NOTIFICATION_HEIGHT);
        let color = severity_color(notification.severity);
        let inner_width = NOTIFICATION_WIDTH.saturating_sub(2) as usize;
        let lines = vec![
            Line::styled(
                compact_text(&notification.body, inner_width),
                Style::default().fg(Color::White),
            ),
            Line::styled(
                time_ago(notification.created_at, now),
                Style::default().fg(MUTED),
            ),
        ];

        frame.render_widget(Clear, slot);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .title(format!(
                        "{} {}",
                        notification.severity.icon(),
                        notification.title
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .style(Style::default().bg(PANEL)),
            ),
            slot,
        );
        y += NOTIFICATION_HEIGHT;
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => INFO,
        Severity::Warning => WARN,
        Severity::Error => ERROR,
        Severity::Success => ACCENT,
    }
}

fn status_color(status: &str) -> Color {
    match status {
        "Running" | "Ready" | "Complete" | "Completed" | "Succeeded" => ACCENT,
        "Pending" | "Progressing" | "ContainerCreating" | "PodInitializing" | "Terminating"
        | "Suspended" => WARN,
        "Unknown" | "" => MUTED,
        _ => ERROR,
    }
}

fn event_type_color(event_type: &str) -> Color {
    match event_type {
        "Normal" => MUTED,
        "Warning" => WARN,
        _ => ERROR,
    }
}

fn log_line_color(line: &str) -> Color {
    let lower = line.to_ascii_lowercase();
    if lower.contains("error") || lower.contains("fatal") {
        ERROR
    } else if lower.contains("warn") {
        WARN
    } else if lower.contains("info") {
        INFO
    } else if lower.contains("debug") {
        MUTED
    } else {
        Color::White
    }
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ')
        .count();
    let indent = &line[..indent_len];
    let trimmed = &line[indent_len..];

    let mut spans = vec![Span::raw(indent.to_string())];
    if trimmed.is_empty() {
        return Line::from(spans);
    }

    if trimmed.starts_with('#') {
        spans.push(Span::styled(trimmed.to_string(), Style::default().fg(MUTED)));
        return Line::from(spans);
    }

    let content = match trimmed.strip_prefix("- ") {
        Some(rest) => {
            spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
            rest
        }
        None => trimmed,
    };

    match split_yaml_key_value(content) {
        Some((key, value)) => {
            spans.push(Span::styled(
                key.to_string(),
                Style::default().fg(Color::Rgb(103, 232, 249)),
            ));
            spans.push(Span::styled(":", Style::default().fg(MUTED)));
            let value = value.trim();
            if !value.is_empty() {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(
                    value.to_string(),
                    Style::default().fg(yaml_value_color(value)),
                ));
            }
        }
        None => spans.push(Span::styled(
            content.to_string(),
            Style::default().fg(Color::White),
        )),
    }
    Line::from(spans)
}

fn split_yaml_key_value(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(' ') || !(value.is_empty() || value.starts_with(' ')) {
        return None;
    }
    Some((key, value))
}

fn yaml_value_color(value: &str) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        Color::Rgb(125, 211, 252)
    } else if matches!(value, "true" | "false" | "null" | "~") {
        WARN
    } else if value.parse::<f64>().is_ok() {
        Color::Rgb(251, 146, 60)
    } else if value.starts_with('{') || value.starts_with('[') {
        MUTED
    } else {
        INFO
    }
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn viewer_rect(area: Rect) -> Rect {
    centered_rect(90, 85, area)
}

fn fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
