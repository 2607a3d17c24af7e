// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State manager: the IDLE/WORK/CHAT/SLEEP machine.
//!
//! Entering sleep writes the sidecar and publishes `sleep_entered`; waking
//! removes it and publishes `sleep_exited`. Persistence failures are
//! logged and the in-memory state wins.

use crate::error::RuntimeError;
use aria_core::{event_data, Clock, EventBus, EventKind, SystemState};
use aria_store::SleepContext;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

pub struct StateManager {
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    sidecar_path: PathBuf,
    current: Mutex<SystemState>,
    sleep_since_ms: Mutex<Option<u64>>,
}

impl StateManager {
    pub fn new(bus: Arc<EventBus>, clock: Arc<dyn Clock>, sidecar_path: PathBuf) -> Self {
        Self {
            bus,
            clock,
            sidecar_path,
            current: Mutex::new(SystemState::Idle),
            sleep_since_ms: Mutex::new(None),
        }
    }

    pub fn current(&self) -> SystemState {
        *self.current.lock()
    }

    /// Transition along a legal edge, publishing `state_changed`.
    pub fn transition(&self, to: SystemState, reason: &str) -> Result<(), RuntimeError> {
        let from = {
            let mut current = self.current.lock();
            let from = *current;
            if !from.can_transition(to) {
                return Err(RuntimeError::StateTransition { from, to });
            }
            *current = to;
            from
        };
        tracing::info!(%from, %to, reason, "state changed");

        if to == SystemState::Sleep {
            self.on_sleep_entered(from, reason, 0.0, 0);
        } else if from == SystemState::Sleep {
            self.on_sleep_exited(reason);
        }

        self.bus.publish(
            EventKind::StateChanged,
            event_data! {
                "from" => from.to_string(),
                "to" => to.to_string(),
                "reason" => reason,
            },
            "state_manager",
        );
        Ok(())
    }

    /// Enter sleep with the measured idle context.
    pub fn enter_sleep(
        &self,
        reason: &str,
        boredom_level: f64,
        inactive_duration_secs: u64,
    ) -> Result<(), RuntimeError> {
        let from = {
            let mut current = self.current.lock();
            let from = *current;
            if !from.can_transition(SystemState::Sleep) {
                return Err(RuntimeError::StateTransition { from, to: SystemState::Sleep });
            }
            *current = SystemState::Sleep;
            from
        };
        self.on_sleep_entered(from, reason, boredom_level, inactive_duration_secs);
        self.bus.publish(
            EventKind::StateChanged,
            event_data! {
                "from" => from.to_string(),
                "to" => "sleep",
                "reason" => reason,
            },
            "state_manager",
        );
        Ok(())
    }

    /// Wake back to idle.
    pub fn wake(&self, reason: &str) -> Result<(), RuntimeError> {
        self.transition(SystemState::Idle, reason)
    }

    fn on_sleep_entered(
        &self,
        previous: SystemState,
        reason: &str,
        boredom_level: f64,
        inactive_duration_secs: u64,
    ) {
        let now = self.clock.epoch_ms();
        *self.sleep_since_ms.lock() = Some(now);

        let context = SleepContext {
            sleep_start_ms: now,
            previous_state: previous.to_string(),
            reason: reason.to_string(),
            boredom_level,
            inactive_duration_secs,
            saved_at: Utc::now(),
        };
        if let Err(e) = context.save(&self.sidecar_path) {
            // In-memory state takes precedence over the sidecar.
            tracing::warn!(error = %e, "sleep context not persisted");
        }

        self.bus.publish(
            EventKind::SleepEntered,
            event_data! {
                "previous_state" => previous.to_string(),
                "reason" => reason,
                "sleep_start" => now,
            },
            "state_manager",
        );
    }

    fn on_sleep_exited(&self, reason: &str) {
        let now = self.clock.epoch_ms();
        let slept_ms = self
            .sleep_since_ms
            .lock()
            .take()
            .map(|since| now.saturating_sub(since))
            .unwrap_or(0);
        SleepContext::clear(&self.sidecar_path);

        self.bus.publish(
            EventKind::SleepExited,
            event_data! {
                "reason" => reason,
                "slept_ms" => slept_ms,
            },
            "state_manager",
        );
    }

    /// Sidecar left over from a previous run, for cross-restart reporting.
    pub fn previous_sleep(&self) -> Option<SleepContext> {
        SleepContext::load(&self.sidecar_path)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
