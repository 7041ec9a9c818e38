use crate::nav::{self, NavItem};
use crate::resource::{self, DEFAULT_TIMEFRAME_MINUTES};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RefreshIntervals {
    pub nodes: Duration,
    pub pods: Duration,
    pub applications: Duration,
    pub events: Duration,
    pub cluster_metrics: Duration,
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            nodes: Duration::from_secs(30),
            pods: Duration::from_secs(15),
            applications: Duration::from_secs(30),
            events: Duration::from_secs(15),
            cluster_metrics: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeekConfig {
    pub source: Option<String>,
    pub navigation: Vec<NavItem>,
    pub refresh: RefreshIntervals,
    pub events_timeframe_minutes: u32,
}

impl Default for PeekConfig {
    fn default() -> Self {
        Self {
            source: None,
            navigation: nav::default_items(),
            refresh: RefreshIntervals::default(),
            events_timeframe_minutes: DEFAULT_TIMEFRAME_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PeekConfigFile {
    #[serde(default)]
    navigation: Vec<NavItem>,
    #[serde(default)]
    refresh: RefreshSpec,
    #[serde(default, alias = "timeframe")]
    events_timeframe_minutes: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RefreshSpec {
    nodes: Option<u64>,
    pods: Option<u64>,
    applications: Option<u64>,
    events: Option<u64>,
    #[serde(alias = "metrics")]
    cluster_metrics: Option<u64>,
}

/// Loads the config from `explicit`, or from the first discovered
/// candidate. No file at all yields the built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<PeekConfig> {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(discover_config_path) else {
        return Ok(PeekConfig::default());
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut config = parse(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.source = Some(path.display().to_string());
    Ok(config)
}

fn parse(raw: &str) -> Result<PeekConfig> {
    let parsed: PeekConfigFile = serde_yaml::from_str(raw)?;
    let defaults = RefreshIntervals::default();
    let seconds = |value: Option<u64>, fallback: Duration| {
        value
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or(fallback)
    };

    let events_timeframe_minutes = match parsed.events_timeframe_minutes {
        Some(minutes) => resource::parse_timeframe(&minutes.to_string())
            .context("invalid events_timeframe_minutes")?,
        None => DEFAULT_TIMEFRAME_MINUTES,
    };

    let navigation = parsed
        .navigation
        .into_iter()
        .filter(|item| !item.name.trim().is_empty())
        .collect::<Vec<_>>();

    Ok(PeekConfig {
        source: None,
        navigation: if navigation.is_empty() {
            nav::default_items()
        } else {
            navigation
        },
        refresh: RefreshIntervals {
            nodes: seconds(parsed.refresh.nodes, defaults.nodes),
            pods: seconds(parsed.refresh.pods, defaults.pods),
            applications: seconds(parsed.refresh.applications, defaults.applications),
            events: seconds(parsed.refresh.events, defaults.events),
            cluster_metrics: seconds(parsed.refresh.cluster_metrics, defaults.cluster_metrics),
        },
        events_timeframe_minutes,
    })
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PEEK_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("peek.yaml"),
        PathBuf::from("peek.yml"),
        PathBuf::from(".peek.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/peek/config.yaml"),
            PathBuf::from(&home).join(".config/peek/config.yml"),
            PathBuf::from(&home).join(".peek.yaml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{RefreshIntervals, parse};
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse("{}").unwrap();
        assert_eq!(config.refresh, RefreshIntervals::default());
        assert_eq!(config.events_timeframe_minutes, 10);
        assert_eq!(config.navigation[0].name, "Overview");
    }

    #[test]
    fn navigation_and_intervals_are_read() {
        let raw = r#"
navigation:
  - name: Workloads
    expanded: true
    children: [Pods, Jobs]
  - name: Nodes
refresh:
  pods: 5
  metrics: 0
events_timeframe_minutes: 60
"#;
        let config = parse(raw).unwrap();
        assert_eq!(config.navigation.len(), 2);
        assert_eq!(config.navigation[0].children, vec!["Pods", "Jobs"]);
        assert!(config.navigation[0].expanded);
        assert!(config.navigation[1].children.is_empty());
        assert_eq!(config.refresh.pods, Duration::from_secs(5));
        assert_eq!(config.refresh.cluster_metrics, Duration::from_secs(1));
        assert_eq!(config.refresh.nodes, Duration::from_secs(30));
        assert_eq!(config.events_timeframe_minutes, 60);
    }

    #[test]
    fn out_of_range_timeframe_is_rejected() {
        assert!(parse("events_timeframe_minutes: 5000").is_err());
    }
}
