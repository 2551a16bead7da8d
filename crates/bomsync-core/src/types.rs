use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// SyncMode
// ---------------------------------------------------------------------------

/// Which trigger source is allowed to start syncs besides manual and startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Every change notification starts a sync.
    Live,
    /// A periodic timer starts syncs; change notifications only refresh.
    #[default]
    Scheduled,
    /// Only explicit user action starts a sync.
    Manual,
}

impl SyncMode {
    pub fn all() -> &'static [SyncMode] {
        &[SyncMode::Live, SyncMode::Scheduled, SyncMode::Manual]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Live => "live",
            SyncMode::Scheduled => "scheduled",
            SyncMode::Manual => "manual",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" | "realtime" => Ok(SyncMode::Live),
            "scheduled" => Ok(SyncMode::Scheduled),
            "manual" => Ok(SyncMode::Manual),
            _ => Err(SyncError::ConfigInvalid(format!(
                "unknown sync mode '{s}': expected live, scheduled or manual"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncTriggerSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTriggerSource {
    Startup,
    Manual,
    Scheduled,
    Realtime,
}

impl SyncTriggerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncTriggerSource::Startup => "startup",
            SyncTriggerSource::Manual => "manual",
            SyncTriggerSource::Scheduled => "scheduled",
            SyncTriggerSource::Realtime => "realtime",
        }
    }
}

impl fmt::Display for SyncTriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// Lifecycle of a sync attempt as seen by observers.
///
/// Transitions: `Idle → Running → Succeeded | Failed → Idle`. The terminal
/// display states revert to `Idle` on a timer owned by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Idle => "idle",
            SyncState::Running => "running",
            SyncState::Succeeded => "succeeded",
            SyncState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SyncResult / HistoryEntry
// ---------------------------------------------------------------------------

/// Summary returned by one completed remote sync run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncResult {
    pub total_parts: u64,
    pub inserted: u64,
    pub updated: u64,
    pub errors: u64,
    pub duration_seconds: f64,
    /// Mirror version label stamped by the remote run (e.g. `SYNC-1718000000`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Per-part validation or load messages reported by the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub source: SyncTriggerSource,
    #[serde(flatten)]
    pub result: SyncResult,
}

impl HistoryEntry {
    pub fn new(source: SyncTriggerSource, result: SyncResult) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            result,
        }
    }
}

// ---------------------------------------------------------------------------
// Change notifications
// ---------------------------------------------------------------------------

/// The two logical tables whose changes are watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Assembly,
    Component,
}

impl Entity {
    pub fn all() -> &'static [Entity] {
        &[Entity::Assembly, Entity::Component]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Assembly => "assembly",
            Entity::Component => "component",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub entity: Entity,
    pub event_type: ChangeKind,
}

impl ChangeEvent {
    pub fn new(entity: Entity, event_type: ChangeKind) -> Self {
        Self { entity, event_type }
    }
}

/// Connection state of the change-notification subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}
