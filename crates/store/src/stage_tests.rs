// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const MIN: u64 = 60 * 1000;
const HOUR: u64 = 60 * MIN;
const NOW: u64 = 1_700_000_000_000;

#[yare::parameterized(
    ten_min_out = { NOW + 10 * MIN, Some(NotificationStage::Before15m) },
    exactly_15_min = { NOW + 15 * MIN, Some(NotificationStage::Before15m) },
    thirty_min_out = { NOW + 30 * MIN, Some(NotificationStage::Before1h) },
    exactly_1h = { NOW + HOUR, Some(NotificationStage::Before1h) },
    five_hours_out = { NOW + 5 * HOUR, Some(NotificationStage::Before24h) },
    exactly_24h = { NOW + 24 * HOUR, Some(NotificationStage::Before24h) },
    two_days_out = { NOW + 48 * HOUR, None },
    already_started = { NOW - MIN, None },
    starting_now = { NOW, None },
)]
fn event_staging(start_ms: u64, expected: Option<NotificationStage>) {
    assert_eq!(NotificationStage::for_event_start(start_ms, NOW), expected);
}

#[yare::parameterized(
    overdue = { NOW - HOUR, Some(NotificationStage::AtDeadline) },
    due_now = { NOW, Some(NotificationStage::AtDeadline) },
    in_30_min = { NOW + 30 * MIN, Some(NotificationStage::Before1h) },
    in_6_hours = { NOW + 6 * HOUR, Some(NotificationStage::Before24h) },
    next_week = { NOW + 7 * 24 * HOUR, None },
)]
fn deadline_staging(deadline_ms: u64, expected: Option<NotificationStage>) {
    assert_eq!(NotificationStage::for_deadline(deadline_ms, NOW), expected);
}

#[test]
fn wire_round_trip() {
    for stage in [
        NotificationStage::Before24h,
        NotificationStage::Before1h,
        NotificationStage::Before15m,
        NotificationStage::AtDeadline,
    ] {
        let s = stage.to_string();
        assert_eq!(s.parse::<NotificationStage>().unwrap(), stage);
    }
    assert!("sometime".parse::<NotificationStage>().is_err());
}
