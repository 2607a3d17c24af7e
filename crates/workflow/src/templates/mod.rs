// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reusable step kinds.
//!
//! Each constructor returns an `Arc<dyn Step>` ready to drop into a
//! [`crate::WorkflowDefinition`]. Interactive templates store their input
//! under a data key (defaulting to the step id); skip checks consult
//! *presence* of that key, never truthiness.

mod choice;
mod compute;
mod conditional;
mod input;
mod llm;
mod system;

pub use choice::{ConfirmationStep, SelectionStep};
pub use compute::{LoopStep, ProcessingStep};
pub use conditional::ConditionalStep;
pub use input::{FileSelectionStep, InputStep};
pub use llm::LlmProcessingStep;
pub use system::{
    InterventionStep, MonitorCreationStep, PeriodicCheckStep, ScheduledTriggerStep, SystemActionStep,
};
