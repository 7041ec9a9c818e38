use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::model::{EventInfo, SnapshotOrder};

pub const DEFAULT_TIMEFRAME_MINUTES: u32 = 10;
pub const MAX_TIMEFRAME_MINUTES: u32 = 1_440;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SnapshotStatus {
    Empty,
    Loading,
    Ready,
    Error(String),
}

/// The latest result of fetching one resource kind.
#[derive(Debug, Clone)]
pub struct ResourceSnapshot<T> {
    pub items: Vec<T>,
    pub fetched_at: Option<Instant>,
    pub status: SnapshotStatus,
}

impl<T> Default for ResourceSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            fetched_at: None,
            status: SnapshotStatus::Empty,
        }
    }
}

/// Cached snapshot plus refresh bookkeeping for one resource kind.
///
/// At most one fetch is outstanding at a time. Stale items stay in place
/// while a refresh runs and after a refresh fails.
#[derive(Debug)]
pub struct ResourceController<T> {
    snapshot: ResourceSnapshot<T>,
    interval: Duration,
    in_flight: bool,
    loaded: bool,
    // Invalidated while a fetch was outstanding; that fetch's result
    // must not count as fresh.
    stale: bool,
}

impl<T: SnapshotOrder> ResourceController<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            snapshot: ResourceSnapshot::default(),
            interval,
            in_flight: false,
            loaded: false,
            stale: false,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.snapshot.items
    }

    pub fn status(&self) -> &SnapshotStatus {
        &self.snapshot.status
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether any fetch has ever succeeded.
    pub fn has_data(&self) -> bool {
        self.loaded
    }

    pub fn error(&self) -> Option<&str> {
        match &self.snapshot.status {
            SnapshotStatus::Error(reason) => Some(reason),
            _ => None,
        }
    }

    /// Full-screen loading applies only until the first data arrives.
    pub fn is_initial_load(&self) -> bool {
        !self.loaded && self.snapshot.status == SnapshotStatus::Loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.loaded && self.in_flight
    }

    pub fn should_refresh(&self, now: Instant) -> bool {
        match self.snapshot.fetched_at {
            Some(fetched_at) => now.saturating_duration_since(fetched_at) > self.interval,
            None => true,
        }
    }

    /// Marks a fetch as outstanding. Returns `false` when one already is.
    pub fn begin_refresh(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        if !self.loaded {
            self.snapshot.status = SnapshotStatus::Loading;
        }
        true
    }

    pub fn apply_result(&mut self, result: Result<Vec<T>, String>, now: Instant) {
        self.in_flight = false;
        let stale = std::mem::take(&mut self.stale);
        match result {
            Ok(mut items) => {
                T::order(&mut items);
                self.snapshot.items = items;
                self.snapshot.fetched_at = (!stale).then_some(now);
                self.snapshot.status = SnapshotStatus::Ready;
                self.loaded = true;
            }
            Err(reason) => {
                self.snapshot.status = SnapshotStatus::Error(reason);
            }
        }
    }

    /// Makes the next `should_refresh` true without dropping cached items.
    /// A fetch already in flight does not satisfy the invalidation.
    pub fn invalidate(&mut self) {
        self.snapshot.fetched_at = None;
        if self.in_flight {
            self.stale = true;
        }
    }

    /// Forgets everything, including an outstanding fetch.
    pub fn reset(&mut self) {
        self.snapshot = ResourceSnapshot::default();
        self.in_flight = false;
        self.loaded = false;
        self.stale = false;
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum TimeframeError {
    #[error("invalid timeframe: must be a number in minutes")]
    NotANumber,
    #[error("must be greater than 0")]
    NotPositive,
    #[error("cannot exceed 1440 minutes (24 hours)")]
    TooLarge,
}

pub fn parse_timeframe(input: &str) -> Result<u32, TimeframeError> {
    let raw = input.trim();
    let minutes = match raw.parse::<i64>() {
        Ok(minutes) => minutes,
        Err(_) if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) => {
            return Err(TimeframeError::TooLarge);
        }
        Err(_) => return Err(TimeframeError::NotANumber),
    };

    if minutes <= 0 {
        Err(TimeframeError::NotPositive)
    } else if minutes > i64::from(MAX_TIMEFRAME_MINUTES) {
        Err(TimeframeError::TooLarge)
    } else {
        Ok(minutes as u32)
    }
}

/// Event controller with its look-back window.
#[derive(Debug)]
pub struct EventsController {
    inner: ResourceController<EventInfo>,
    timeframe_minutes: u32,
}

impl EventsController {
    pub fn new(interval: Duration, timeframe_minutes: u32) -> Self {
        Self {
            inner: ResourceController::new(interval),
            timeframe_minutes,
        }
    }

    pub fn timeframe_minutes(&self) -> u32 {
        self.timeframe_minutes
    }

    /// Validates and applies a new window; the next tick refetches.
    /// Invalid input leaves the current window untouched.
    pub fn set_timeframe(&mut self, input: &str) -> Result<u32, TimeframeError> {
        let minutes = parse_timeframe(input)?;
        self.timeframe_minutes = minutes;
        self.inner.invalidate();
        Ok(minutes)
    }
}

impl Deref for EventsController {
    type Target = ResourceController<EventInfo>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for EventsController {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
