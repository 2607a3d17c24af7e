// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::host::NoopHost;
use aria_core::SessionId;
use serde_json::json;

fn ctx<'a>(data: &'a mut ContextMap, host: &'a NoopHost) -> StepContext<'a> {
    StepContext {
        session_id: SessionId::from_string("ses-test"),
        data,
        host,
    }
}

#[test]
fn processing_step_runs_closure_against_session_data() {
    let step = ProcessingStep::new("count_words", |ctx| {
        let text = ctx.data.get_str("file_content").unwrap_or_default();
        let count = text.split_whitespace().count() as i64;
        ctx.data.set("word_count", count);
        StepResult::success(format!("{count} words")).with_entry("word_count", count)
    });
    let host = NoopHost::new();
    let mut data = ContextMap::new();
    data.set("file_content", "one two three");
    let result = step.execute(None, &mut ctx(&mut data, &host));
    assert!(result.success);
    assert_eq!(data.get("word_count"), Some(&json!(3)));
    assert!(step.should_auto_advance());
}

#[test]
fn loop_step_counts_iterations_until_body_stops() {
    let step = LoopStep::new("drain_queue", |ctx| {
        let remaining = ctx.data.get("remaining").and_then(|v| v.as_i64()).unwrap_or(0);
        if remaining > 0 {
            ctx.data.set("remaining", remaining - 1);
            StepResult::success("one more").stay()
        } else {
            StepResult::success("drained")
        }
    });
    let host = NoopHost::new();
    let mut data = ContextMap::new();
    data.set("remaining", 3);

    for _ in 0..3 {
        let result = step.execute(None, &mut ctx(&mut data, &host));
        assert!(result.continue_current_step);
    }
    let result = step.execute(None, &mut ctx(&mut data, &host));
    assert!(!result.continue_current_step);
    // Counter is cleaned up once the loop exits.
    assert!(!data.has("__loop_count_drain_queue"));
}

#[test]
fn loop_step_fails_past_max_iterations() {
    let step = LoopStep::new("spin", |_| StepResult::success("again").stay()).max_iterations(5);
    let host = NoopHost::new();
    let mut data = ContextMap::new();

    let mut last = StepResult::success("");
    for _ in 0..=5 {
        last = step.execute(None, &mut ctx(&mut data, &host));
    }
    assert!(!last.success);
    assert!(last.message.contains("exceeded"));
}
