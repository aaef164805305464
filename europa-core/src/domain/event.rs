//! Repository event domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity recorded against a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoEvent {
    pub id: String,
    #[serde(default)]
    pub repo_id: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub event_time: Option<i64>,
    pub event_type: EventType,
    #[serde(default)]
    pub image_tags: Vec<String>,
    #[serde(default)]
    pub image_sha: Option<String>,
}

impl RepoEvent {
    pub fn event_time_utc(&self) -> Option<DateTime<Utc>> {
        self.event_time.and_then(DateTime::from_timestamp_millis)
    }

    pub fn is_push(&self) -> bool {
        self.event_type == EventType::Push
    }

    /// Whether any image tag contains `filter` (an empty filter matches everything)
    pub fn matches_tag(&self, filter: &str) -> bool {
        filter.is_empty() || self.image_tags.iter().any(|tag| tag.contains(filter))
    }
}

/// Kind of repository event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Push,
    Pull,
    Sync,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Push => write!(f, "PUSH"),
            EventType::Pull => write!(f, "PULL"),
            EventType::Sync => write!(f, "SYNC"),
            EventType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One page of repository events with its pagination markers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    #[serde(default)]
    pub events: Vec<RepoEvent>,
    #[serde(default)]
    pub prev_marker: Option<String>,
    #[serde(default)]
    pub next_marker: Option<String>,
}
