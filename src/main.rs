mod app;
mod cli;
mod config;
mod connection;
mod fuzzy;
mod input;
mod k8s;
mod model;
mod nav;
mod notify;
mod resource;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppMessage, FetchPayload, INITIAL_LOG_LINES};
use clap::Parser;
use cli::CliArgs;
use connection::{ClusterError, categorize_error};
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use k8s::{KubeGateway, KubeSetup, compact_error};
use model::{NamespaceScope, ResourceKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::future::Future;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_TICK_MS: u64 = 250;

/// What background tasks post back to the UI loop.
enum Delivery {
    App(AppMessage),
    Validated {
        context: String,
        result: std::result::Result<(KubeGateway, Vec<String>), ClusterError>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;
    let config = config::load(args.config.as_deref())?;
    if let Some(source) = config.source.as_deref() {
        info!("loaded config from {source}");
    }

    let (setup, mut app, startup_error) = match KubeSetup::load(args.context.as_deref()) {
        Ok(setup) => {
            let scope = resolve_namespace_scope(&args, &setup);
            let app = App::new(
                &config,
                setup.current().to_string(),
                setup.contexts().to_vec(),
                scope,
            );
            (Some(setup), app, None)
        }
        Err(error) => {
            warn!("kubeconfig unavailable: {error:#}");
            let mut app = App::new(&config, String::new(), Vec::new(), NamespaceScope::All);
            app.set_fatal(compact_error(&error));
            (None, app, Some(error))
        }
    };

    run(&mut app, setup, args.tick_ms.max(MIN_TICK_MS)).await?;

    match startup_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::sink).try_init(),
    };

    Ok(())
}

fn resolve_namespace_scope(args: &CliArgs, setup: &KubeSetup) -> NamespaceScope {
    match &args.namespace {
        Some(namespace) => NamespaceScope::Named(namespace.clone()),
        None => NamespaceScope::Named(setup.default_namespace().to_string()),
    }
}

async fn run(app: &mut App, setup: Option<KubeSetup>, tick_ms: u64) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, setup, tick_ms).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    setup: Option<KubeSetup>,
    tick_ms: u64,
) -> Result<()> {
    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let (inbox_tx, mut inbox) = mpsc::unbounded_channel::<Delivery>();
    let mut session = Session::new(setup, inbox_tx);

    let commands = app.begin_connection();
    session.execute(app, commands);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        let commands = tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match input::map_key(app.input_layer(), key) {
                            Some(action) => {
                                debug!("action={action:?}");
                                app.handle_action(action, Instant::now())
                            }
                            None => Vec::new(),
                        }
                    }
                    Some(Ok(_)) => Vec::new(),
                    Some(Err(error)) => {
                        warn!("terminal event error: {error}");
                        Vec::new()
                    }
                    None => {
                        warn!("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => app.on_tick(Instant::now()),
            Some(delivery) = inbox.recv() => session.receive(app, delivery),
        };
        session.execute(app, commands);
    }

    session.shutdown();
    Ok(())
}

/// Owns the cluster clients and the background tasks working for the UI.
struct Session {
    setup: Option<KubeSetup>,
    gateway: Option<KubeGateway>,
    validated: Option<(String, KubeGateway)>,
    inbox: mpsc::UnboundedSender<Delivery>,
    viewer: Option<JoinHandle<()>>,
}

impl Session {
    fn new(setup: Option<KubeSetup>, inbox: mpsc::UnboundedSender<Delivery>) -> Self {
        Self {
            setup,
            gateway: None,
            validated: None,
            inbox,
            viewer: None,
        }
    }

    fn receive(&mut self, app: &mut App, delivery: Delivery) -> Vec<AppCommand> {
        let message = match delivery {
            Delivery::App(message) => message,
            Delivery::Validated { context, result } => {
                let result = match result {
                    Ok((gateway, namespaces)) => {
                        self.validated = Some((context.clone(), gateway));
                        Ok(namespaces)
                    }
                    Err(error) => {
                        warn!(
                            "context {context} rejected ({}): {error}",
                            error.category().label()
                        );
                        Err(error)
                    }
                };
                AppMessage::ContextValidated { context, result }
            }
        };
        app.apply_message(message, Instant::now())
    }

    fn execute(&mut self, app: &App, commands: Vec<AppCommand>) {
        for command in commands {
            self.execute_one(app, command);
        }
    }

    fn execute_one(&mut self, app: &App, command: AppCommand) {
        match command {
            AppCommand::ValidateContext { context } => {
                let Some(setup) = self.setup.clone() else {
                    return;
                };
                let tx = self.inbox.clone();
                tokio::spawn(async move {
                    let result = KubeGateway::validate(&setup, &context).await;
                    let _ = tx.send(Delivery::Validated { context, result });
                });
            }
            AppCommand::CommitContext { context } => match self.validated.take() {
                Some((validated, gateway)) if validated == context => {
                    info!("using context {}", gateway.context());
                    self.gateway = Some(gateway);
                }
                _ => warn!("no validated client for context {context}"),
            },
            AppCommand::Fetch { kind, epoch } => {
                let tx = self.inbox.clone();
                let scope = app.namespace_scope().clone();
                let Some(gateway) = self.gateway.clone() else {
                    let payload = failed_payload(kind, "not connected to a cluster".to_string());
                    let _ = tx.send(Delivery::App(AppMessage::Fetched {
                        epoch,
                        scope,
                        payload,
                    }));
                    return;
                };
                let minutes = app.events().timeframe_minutes();
                tokio::spawn(async move {
                    let payload = fetch(&gateway, kind, &scope, minutes).await;
                    let _ = tx.send(Delivery::App(AppMessage::Fetched {
                        epoch,
                        scope,
                        payload,
                    }));
                });
            }
            AppCommand::LoadNamespaces { epoch } => {
                let tx = self.inbox.clone();
                let gateway = self.gateway.clone();
                tokio::spawn(async move {
                    let result = match gateway {
                        Some(gateway) => bounded(gateway.list_namespaces()).await,
                        None => Err("not connected to a cluster".to_string()),
                    };
                    let _ = tx.send(Delivery::App(AppMessage::Namespaces { epoch, result }));
                });
            }
            AppCommand::StreamLogs {
                stream,
                namespace,
                pod,
                container,
            } => {
                let Some(gateway) = self.gateway.clone() else {
                    return;
                };
                let tx = self.inbox.clone();
                self.replace_viewer(tokio::spawn(async move {
                    let result = gateway
                        .follow_pod_logs(
                            &namespace,
                            &pod,
                            container.as_deref(),
                            INITIAL_LOG_LINES,
                            |lines| {
                                tx.send(Delivery::App(AppMessage::LogLines { stream, lines }))
                                    .is_ok()
                            },
                        )
                        .await;
                    let error = result
                        .err()
                        .map(|error| describe_failure(&compact_error(&error)));
                    debug!("log stream {stream} for {namespace}/{pod} ended");
                    let _ = tx.send(Delivery::App(AppMessage::LogStreamEnded { stream, error }));
                }));
            }
            AppCommand::LoadManifest {
                request,
                namespace,
                pod,
            } => {
                let Some(gateway) = self.gateway.clone() else {
                    return;
                };
                let tx = self.inbox.clone();
                self.replace_viewer(tokio::spawn(async move {
                    let result = bounded(gateway.pod_manifest(&namespace, &pod)).await;
                    let _ = tx.send(Delivery::App(AppMessage::Manifest { request, result }));
                }));
            }
            AppCommand::CancelViewer => {
                if let Some(task) = self.viewer.take() {
                    task.abort();
                }
            }
            AppCommand::DeletePod {
                namespace,
                pod,
                restart,
            } => {
                let Some(gateway) = self.gateway.clone() else {
                    return;
                };
                let tx = self.inbox.clone();
                info!(
                    "{} pod {namespace}/{pod}",
                    if restart { "restarting" } else { "deleting" }
                );
                tokio::spawn(async move {
                    let result = bounded(gateway.delete_pod(&namespace, &pod)).await;
                    let _ = tx.send(Delivery::App(AppMessage::PodDeleted {
                        namespace,
                        pod,
                        restart,
                        result,
                    }));
                });
            }
        }
    }

    fn replace_viewer(&mut self, task: JoinHandle<()>) {
        if let Some(previous) = self.viewer.replace(task) {
            previous.abort();
        }
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.viewer.take() {
            task.abort();
        }
    }
}

async fn fetch(
    gateway: &KubeGateway,
    kind: ResourceKind,
    scope: &NamespaceScope,
    minutes: u32,
) -> FetchPayload {
    match kind {
        ResourceKind::Nodes => FetchPayload::Nodes(bounded(gateway.list_nodes()).await),
        ResourceKind::Pods => FetchPayload::Pods(bounded(gateway.list_pods(scope)).await),
        ResourceKind::Applications => {
            FetchPayload::Applications(bounded(gateway.list_applications(scope)).await)
        }
        ResourceKind::Events => FetchPayload::Events(bounded(gateway.list_events(minutes)).await),
        ResourceKind::ClusterMetrics => {
            FetchPayload::ClusterMetrics(bounded(gateway.cluster_metrics()).await)
        }
    }
}

fn failed_payload(kind: ResourceKind, message: String) -> FetchPayload {
    match kind {
        ResourceKind::Nodes => FetchPayload::Nodes(Err(message)),
        ResourceKind::Pods => FetchPayload::Pods(Err(message)),
        ResourceKind::Applications => FetchPayload::Applications(Err(message)),
        ResourceKind::Events => FetchPayload::Events(Err(message)),
        ResourceKind::ClusterMetrics => FetchPayload::ClusterMetrics(Err(message)),
    }
}

/// Runs a gateway call under `FETCH_TIMEOUT`, flattening failures into a
/// categorized message.
async fn bounded<T>(call: impl Future<Output = Result<T>>) -> std::result::Result<T, String> {
    match timeout(FETCH_TIMEOUT, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(describe_failure(&compact_error(&error))),
        Err(_) => Err(describe_failure(&format!(
            "request timed out after {}s",
            FETCH_TIMEOUT.as_secs()
        ))),
    }
}

fn describe_failure(message: &str) -> String {
    format!("{}: {message}", categorize_error(message).label())
}

#[cfg(test)]
mod tests {
    use super::{describe_failure, failed_payload};
    use crate::app::FetchPayload;
    use crate::model::ResourceKind;

    #[test]
    fn failures_are_prefixed_with_their_category() {
        assert_eq!(
            describe_failure("request timed out after 10s"),
            "timeout: request timed out after 10s"
        );
        assert_eq!(
            describe_failure("HTTP 403 Forbidden"),
            "unauthorized: HTTP 403 Forbidden"
        );
        assert_eq!(
            describe_failure("tcp connect error: Connection refused"),
            "unreachable: tcp connect error: Connection refused"
        );
        assert_eq!(describe_failure("boom"), "error: boom");
    }

    #[test]
    fn failed_payload_keeps_the_kind() {
        for kind in ResourceKind::ALL {
            let payload = failed_payload(kind, "not connected".to_string());
            assert_eq!(payload.kind(), kind);
        }
        assert!(matches!(
            failed_payload(ResourceKind::Events, "x".to_string()),
            FetchPayload::Events(Err(message)) if message == "x"
        ));
    }
}
