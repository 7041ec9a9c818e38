use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_NOTIFICATIONS: usize = 10;
const MAX_VISIBLE: usize = 3;
const DEFAULT_TTL: Duration = Duration::from_secs(5);
const ERROR_TTL: Duration = Duration::from_secs(7);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

impl Severity {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Warning => "⚠",
            Self::Error => "✗",
            Self::Success => "✓",
        }
    }

    fn ttl(self) -> Duration {
        match self {
            Self::Error => ERROR_TTL,
            _ => DEFAULT_TTL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub title: String,
    pub body: String,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl Notification {
    pub fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }
}

/// Transient messages, newest first, bounded in count and lifetime.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    next_id: u64,
}

impl NotificationQueue {
    pub fn push(
        &mut self,
        severity: Severity,
        title: impl Into<String>,
        body: impl Into<String>,
        now: Instant,
    ) -> u64 {
        self.next_id += 1;
        self.items.push_front(Notification {
            id: self.next_id,
            severity,
            title: title.into(),
            body: body.into(),
            created_at: now,
            ttl: severity.ttl(),
        });
        self.items.truncate(MAX_NOTIFICATIONS);
        self.next_id
    }

    pub fn clean_expired(&mut self, now: Instant) {
        self.items.retain(|item| !item.expired(now));
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter().take(MAX_VISIBLE)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn time_ago(created_at: Instant, now: Instant) -> String {
    let seconds = now.saturating_duration_since(created_at).as_secs();
    match seconds {
        0 => "just now".to_string(),
        1..=59 => format!("{seconds}s ago"),
        60..=3_599 => format!("{}m ago", seconds / 60),
        _ => format!("{}h ago", seconds / 3_600),
    }
}
