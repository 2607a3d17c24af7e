// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coarse system states and the legal transition edges.

use serde::{Deserialize, Serialize};

/// Coarse operating state of the whole runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Idle,
    Work,
    Chat,
    Sleep,
}

crate::simple_display! {
    SystemState {
        Idle => "idle",
        Work => "work",
        Chat => "chat",
        Sleep => "sleep",
    }
}

impl SystemState {
    /// Legal edges: IDLE↔CHAT, IDLE→WORK, WORK→IDLE, IDLE↔SLEEP.
    pub fn can_transition(&self, to: SystemState) -> bool {
        use SystemState::*;
        matches!(
            (self, to),
            (Idle, Chat) | (Chat, Idle) | (Idle, Work) | (Work, Idle) | (Idle, Sleep) | (Sleep, Idle)
        )
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
