// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for definitions and the engine.

use thiserror::Error;

/// Problems with a workflow definition (construction or loading).
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("entry point `{0}` is not a defined step")]
    MissingEntryPoint(String),

    #[error("transition source `{0}` is not a defined step")]
    UnknownTransitionSource(String),

    #[error("transition target `{target}` from `{from}` is not a defined step")]
    UnknownTransitionTarget { from: String, target: String },

    #[error("duplicate step id `{0}`")]
    DuplicateStep(String),

    #[error("unknown step type `{0}`")]
    UnknownStepType(String),

    #[error("step `{step}` is missing required field `{field}`")]
    MissingField { step: String, field: String },

    #[error("workflow type `{0}` is not defined")]
    UnknownWorkflow(String),

    #[error("failed to read definition file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse definition file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine-level failures (distinct from step failures, which are data).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing required data: {0}")]
    MissingRequiredData(String),

    #[error("step `{step}` references unknown target `{target}`")]
    UnknownStep { step: String, target: String },

    #[error("no review is pending")]
    NoPendingReview,

    #[error("engine is awaiting llm review")]
    AwaitingReview,

    #[error("session error: {0}")]
    Session(#[from] aria_core::SessionError),
}
