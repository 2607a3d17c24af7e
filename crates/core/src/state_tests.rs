// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    idle_to_chat = { SystemState::Idle, SystemState::Chat, true },
    chat_to_idle = { SystemState::Chat, SystemState::Idle, true },
    idle_to_work = { SystemState::Idle, SystemState::Work, true },
    work_to_idle = { SystemState::Work, SystemState::Idle, true },
    idle_to_sleep = { SystemState::Idle, SystemState::Sleep, true },
    sleep_to_idle = { SystemState::Sleep, SystemState::Idle, true },
    chat_to_work = { SystemState::Chat, SystemState::Work, false },
    work_to_chat = { SystemState::Work, SystemState::Chat, false },
    sleep_to_work = { SystemState::Sleep, SystemState::Work, false },
    work_to_sleep = { SystemState::Work, SystemState::Sleep, false },
    chat_to_sleep = { SystemState::Chat, SystemState::Sleep, false },
    self_edge = { SystemState::Idle, SystemState::Idle, false },
)]
fn edges(from: SystemState, to: SystemState, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed);
}

#[test]
fn wire_values() {
    assert_eq!(SystemState::Idle.to_string(), "idle");
    assert_eq!(SystemState::Sleep.to_string(), "sleep");
    let json = serde_json::to_string(&SystemState::Work).unwrap();
    assert_eq!(json, "\"work\"");
}
