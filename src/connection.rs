use thiserror::Error;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorCategory {
    Timeout,
    Unauthorized,
    NetworkUnreachable,
    Unknown,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::NetworkUnreachable => "unreachable",
            Self::Unknown => "error",
        }
    }
}

const TIMEOUT_MARKERS: [&str; 4] = [
    "timeout",
    "timed out",
    "deadline exceeded",
    "deadline has elapsed",
];
const UNAUTHORIZED_MARKERS: [&str; 4] = ["unauthorized", "401", "forbidden", "403"];
const NETWORK_MARKERS: [&str; 6] = [
    "connection refused",
    "no such host",
    "network is unreachable",
    "no route to host",
    "failed to lookup address",
    "name or service not known",
];

/// Classifies a failure message. Checks run in a fixed order: timeout,
/// then authorization, then network reachability.
pub fn categorize_error(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    let has_any = |markers: &[&str]| markers.iter().any(|marker| lower.contains(marker));

    if has_any(&TIMEOUT_MARKERS) {
        ErrorCategory::Timeout
    } else if has_any(&UNAUTHORIZED_MARKERS) {
        ErrorCategory::Unauthorized
    } else if has_any(&NETWORK_MARKERS) {
        ErrorCategory::NetworkUnreachable
    } else {
        ErrorCategory::Unknown
    }
}

/// A failed attempt to talk to a cluster context.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ClusterError {
    #[error("connection timeout to cluster '{context}': {detail}")]
    Timeout { context: String, detail: String },
    #[error("authentication failed for cluster '{context}': {detail}")]
    Unauthorized { context: String, detail: String },
    #[error("cannot reach cluster '{context}': {detail}")]
    NetworkUnreachable { context: String, detail: String },
    #[error("failed to list namespaces: {detail}")]
    Unknown { context: String, detail: String },
}

impl ClusterError {
    pub fn from_failure(context: &str, detail: impl Into<String>) -> Self {
        let context = context.to_string();
        let detail = detail.into();
        match categorize_error(&detail) {
            ErrorCategory::Timeout => Self::Timeout { context, detail },
            ErrorCategory::Unauthorized => Self::Unauthorized { context, detail },
            ErrorCategory::NetworkUnreachable => Self::NetworkUnreachable { context, detail },
            ErrorCategory::Unknown => Self::Unknown { context, detail },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Unauthorized { .. } => ErrorCategory::Unauthorized,
            Self::NetworkUnreachable { .. } => ErrorCategory::NetworkUnreachable,
            Self::Unknown { .. } => ErrorCategory::Unknown,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConnectionState {
    Idle,
    Connecting(String),
    Error(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SwitchOutcome {
    Committed,
    Failed(String),
    /// The result does not belong to the switch in progress.
    Ignored,
}

/// Owns the committed context and the validation state of a candidate.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    current: String,
    contexts: Vec<String>,
    state: ConnectionState,
    connected_once: bool,
}

impl ConnectionManager {
    pub fn new(current: String, contexts: Vec<String>) -> Self {
        Self {
            current,
            contexts,
            state: ConnectionState::Idle,
            connected_once: false,
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.state, ConnectionState::Connecting(_))
    }

    pub fn connected_once(&self) -> bool {
        self.connected_once
    }

    /// Moves to `Connecting`. Rejected while another candidate is validating.
    pub fn request_switch(&mut self, candidate: &str) -> bool {
        if self.is_connecting() {
            return false;
        }
        self.state = ConnectionState::Connecting(candidate.to_string());
        true
    }

    pub fn apply_result(
        &mut self,
        candidate: &str,
        result: Result<(), ClusterError>,
    ) -> SwitchOutcome {
        match &self.state {
            ConnectionState::Connecting(pending) if pending == candidate => {}
            _ => return SwitchOutcome::Ignored,
        }

        match result {
            Ok(()) => {
                self.current = candidate.to_string();
                self.state = ConnectionState::Idle;
                self.connected_once = true;
                SwitchOutcome::Committed
            }
            Err(error) => {
                let message = if !self.connected_once && candidate == self.current {
                    format!("Failed to connect to current context: {error}")
                } else {
                    error.to_string()
                };
                self.state = ConnectionState::Error(message.clone());
                SwitchOutcome::Failed(message)
            }
        }
    }

    pub fn clear_error(&mut self) {
        if matches!(self.state, ConnectionState::Error(_)) {
            self.state = ConnectionState::Idle;
        }
    }
}
