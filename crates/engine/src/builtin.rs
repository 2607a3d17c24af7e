// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in workflow definitions registered at runtime construction.

use aria_workflow::config::{CatalogueEntry, InferCondition, InferRule, InitialParam};
use aria_workflow::definition::{Transition, WorkflowDefinition, WorkflowMode, END};
use aria_workflow::templates::{
    ConditionalStep, InputStep, MonitorCreationStep, ProcessingStep, SelectionStep,
    SystemActionStep,
};
use aria_workflow::{StepResult, WorkflowRegistry};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

/// Register the built-in workflow set.
pub fn register_builtin_workflows(registry: &WorkflowRegistry) {
    registry.register_catalogue("drop_and_read", drop_and_read_catalogue(), drop_and_read);
    registry.register("batch_cleanup", batch_cleanup);
    registry.register("watch_folder", watch_folder);
    registry.register("play_media", play_media);
}

fn drop_and_read_catalogue() -> CatalogueEntry {
    let mut initial_params = IndexMap::new();
    initial_params.insert(
        "current_file_path".to_string(),
        InitialParam {
            maps_to_step: "file_path_input".to_string(),
            infer_from: vec![InferRule {
                param: "file_path".to_string(),
                condition: InferCondition::Exists,
                value: None,
                reason: "caller supplied an explicit path".to_string(),
            }],
        },
    );
    CatalogueEntry {
        name: "Read a file".to_string(),
        description: "Read the file the user dropped or named".to_string(),
        workflow_mode: WorkflowMode::Direct,
        requires_llm_review: false,
        auto_advance_on_approval: true,
        initial_params,
    }
}

/// File read: ask for a path unless one is already known, then read.
fn drop_and_read() -> WorkflowDefinition {
    WorkflowDefinition::new("drop_and_read", "Read a file")
        .description("Read the file the user dropped or named")
        .add_step(
            InputStep::new("file_path_input", "which file should I read?")
                .skip_if_present(true)
                .description("Path of the file to read")
                .arc(),
        )
        .add_step(
            SystemActionStep::new("execute_read", "read_file")
                .param_from_data("file_path_input")
                .result_key("file_content")
                .description("Read the file contents")
                .arc(),
        )
        .add_transition("file_path_input", Transition::unconditional("execute_read"))
        .add_transition("execute_read", Transition::unconditional(END))
        .entry_point("file_path_input")
}

/// Non-interactive three-stage chain, runnable in the background pool.
fn batch_cleanup() -> WorkflowDefinition {
    WorkflowDefinition::new("batch_cleanup", "Batch cleanup")
        .description("Scan, select, and stage stale items for cleanup")
        .mode(WorkflowMode::Background)
        .add_step(
            ProcessingStep::new("scan", |ctx| {
                let total = ctx.data.get("item_count").and_then(|v| v.as_i64()).unwrap_or(0);
                ctx.data.set("scanned", total);
                StepResult::success(format!("scanned {total} items")).with_entry("scanned", total)
            })
            .description("Enumerate candidate items")
            .arc(),
        )
        .add_step(
            ProcessingStep::new("select_stale", |ctx| {
                let scanned = ctx.data.get("scanned").and_then(|v| v.as_i64()).unwrap_or(0);
                let stale = scanned / 2;
                ctx.data.set("stale", stale);
                StepResult::success(format!("{stale} stale")).with_entry("stale", stale)
            })
            .arc(),
        )
        .add_step(
            ProcessingStep::new("stage_removal", |ctx| {
                let stale = ctx.data.get("stale").and_then(|v| v.as_i64()).unwrap_or(0);
                StepResult::success(format!("staged {stale} for removal"))
                    .with_entry("staged", stale)
            })
            .arc(),
        )
        .add_transition("scan", Transition::unconditional("select_stale"))
        .add_transition("select_stale", Transition::unconditional("stage_removal"))
        .add_transition("stage_removal", Transition::unconditional(END))
        .entry_point("scan")
}

/// Branching playback: a scope selection routes either through an
/// interactive track prompt or straight to whole-folder playback (an
/// empty query is a valid, present value), then the media action runs.
fn play_media() -> WorkflowDefinition {
    // The interactive branch step is registered in the graph too: the
    // conditional jumps to it when it needs input and resumes after it.
    let track_query = InputStep::new("track_query", "which track should I play?").arc();

    WorkflowDefinition::new("play_media", "Play media")
        .description("Play a single track or the whole folder")
        .add_step(
            SelectionStep::new(
                "playback_scope",
                "play what?",
                ["single track", "whole folder"],
            )
            .description("Scope of playback")
            .arc(),
        )
        .add_step(Arc::clone(&track_query))
        .add_step(
            ConditionalStep::new("resolve_target", "playback_scope")
                .branch("1", vec![Arc::clone(&track_query)])
                .branch(
                    "2",
                    vec![ProcessingStep::new("queue_whole_folder", |ctx| {
                        ctx.data.set("track_query", "");
                        StepResult::success("queueing the whole folder")
                            .with_entry("track_query", "")
                    })
                    .arc()],
                )
                .description("Resolve what to hand to the player")
                .arc(),
        )
        .add_step(
            SystemActionStep::new("start_playback", "media_control")
                .param("command", "play")
                .param_from_data("track_query")
                .arc(),
        )
        .add_transition("playback_scope", Transition::unconditional("resolve_target"))
        .add_transition("track_query", Transition::unconditional("resolve_target"))
        .add_transition("resolve_target", Transition::unconditional("start_playback"))
        .add_transition("start_playback", Transition::unconditional(END))
        .entry_point("playback_scope")
}

/// Create a folder monitor: ask for the path, then register the monitor.
fn watch_folder() -> WorkflowDefinition {
    WorkflowDefinition::new("watch_folder", "Watch a folder")
        .description("Create a monitoring task for a folder")
        .add_step(
            InputStep::new("folder_path", "which folder should I watch?")
                .skip_if_present(true)
                .arc(),
        )
        .add_step(
            MonitorCreationStep::new("create_monitor", "folder_watch")
                .metadata_from_data("folder_path")
                .check_interval(Duration::from_secs(60))
                .description("Register the folder monitor")
                .arc(),
        )
        .add_transition("folder_path", Transition::unconditional("create_monitor"))
        .add_transition("create_monitor", Transition::unconditional(END))
        .entry_point("folder_path")
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
