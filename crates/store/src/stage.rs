// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification stages: discrete time-to-deadline buckets, each emitted at
//! most once per entity.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const MS_PER_MIN: u64 = 60 * 1000;
const MS_PER_HOUR: u64 = 60 * MS_PER_MIN;

/// Stage buckets for calendar events and TODO deadlines.
///
/// Calendar events use the three `*_before` stages; TODOs replace the
/// 15-minute bucket with `at_deadline` once the deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStage {
    Before24h,
    Before1h,
    Before15m,
    AtDeadline,
}

aria_core::simple_display! {
    NotificationStage {
        Before24h => "24h_before",
        Before1h => "1h_before",
        Before15m => "15min_before",
        AtDeadline => "at_deadline",
    }
}

impl FromStr for NotificationStage {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h_before" => Ok(Self::Before24h),
            "1h_before" => Ok(Self::Before1h),
            "15min_before" => Ok(Self::Before15m),
            "at_deadline" => Ok(Self::AtDeadline),
            other => Err(StoreError::UnknownValue {
                what: "notification stage",
                value: other.to_string(),
            }),
        }
    }
}

impl NotificationStage {
    /// Stage for a calendar event starting at `start_ms`, or `None` when
    /// the event is more than 24 h out or already started.
    pub fn for_event_start(start_ms: u64, now_ms: u64) -> Option<Self> {
        if start_ms <= now_ms {
            return None;
        }
        let lead = start_ms - now_ms;
        if lead <= 15 * MS_PER_MIN {
            Some(Self::Before15m)
        } else if lead <= MS_PER_HOUR {
            Some(Self::Before1h)
        } else if lead <= 24 * MS_PER_HOUR {
            Some(Self::Before24h)
        } else {
            None
        }
    }

    /// Stage for a TODO deadline at `deadline_ms`: past deadlines bucket
    /// into `at_deadline`, future ones into the lead-time stages.
    pub fn for_deadline(deadline_ms: u64, now_ms: u64) -> Option<Self> {
        if deadline_ms <= now_ms {
            return Some(Self::AtDeadline);
        }
        let lead = deadline_ms - now_ms;
        if lead <= MS_PER_HOUR {
            Some(Self::Before1h)
        } else if lead <= 24 * MS_PER_HOUR {
            Some(Self::Before24h)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
