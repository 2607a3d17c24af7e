// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aria-store: embedded relational persistence for scheduled entities and
//! background workflow records, plus the small JSON sidecars.

pub mod background;
pub mod calendar;
pub mod db;
pub mod error;
pub mod reminders;
pub mod sidecar;
pub mod stage;
pub mod todos;

pub use background::{BackgroundRecord, BackgroundStatus, InterventionRecord};
pub use calendar::CalendarEvent;
pub use db::Store;
pub use error::StoreError;
pub use reminders::Reminder;
pub use sidecar::{SleepContext, TaskSnapshot, TaskSnapshotEntry};
pub use stage::NotificationStage;
pub use todos::{TodoItem, TodoPriority, TodoStatus};
