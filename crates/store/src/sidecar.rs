// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small JSON sidecar files under the state directory.
//!
//! Both sidecars are best-effort: a missing or corrupt file reads as
//! "nothing there" and never blocks startup.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the runtime remembers across a sleep, for cross-restart reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepContext {
    pub sleep_start_ms: u64,
    pub previous_state: String,
    pub reason: String,
    #[serde(default)]
    pub boredom_level: f64,
    #[serde(default)]
    pub inactive_duration_secs: u64,
    /// Wall-clock stamp for humans reading the file.
    pub saved_at: DateTime<Utc>,
}

impl SleepContext {
    /// Write the sidecar. Overwrites any previous sleep context.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a sidecar left by a previous run, if any survives.
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&text) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt sleep sidecar ignored");
                None
            }
        }
    }

    /// Remove the sidecar on wake. Missing file is fine.
    pub fn clear(path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove sleep sidecar");
            }
        }
    }
}

/// Persisted snapshot of the controller's background task registry.
///
/// Loss is non-fatal: the registry repopulates as tasks run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    #[serde(default)]
    pub entries: Vec<TaskSnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshotEntry {
    pub task_id: String,
    pub workflow_type: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub status: String,
    pub started_at_ms: u64,
}

impl TaskSnapshot {
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Best-effort load: errors are logged and read as an empty snapshot.
    pub fn load(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt task snapshot ignored");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
#[path = "sidecar_tests.rs"]
mod tests;
