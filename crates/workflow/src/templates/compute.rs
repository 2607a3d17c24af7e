// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-contained computation steps: processing closures and loops.

use crate::result::StepResult;
use crate::step::{Step, StepContext, StepType};
use aria_core::ContextMap;
use std::sync::Arc;

type ProcessFn = dyn Fn(&mut StepContext<'_>) -> StepResult + Send + Sync;

/// Processing step backed by a closure. Auto-advances.
pub struct ProcessingStep {
    id: String,
    description: String,
    run: Box<ProcessFn>,
}

impl ProcessingStep {
    pub fn new(
        id: impl Into<String>,
        run: impl Fn(&mut StepContext<'_>) -> StepResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            run: Box::new(run),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for ProcessingStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::Processing
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        format!("processing: {}", self.id)
    }

    fn execute(&self, _input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        (self.run)(ctx)
    }
}

/// Loop step: re-runs its body while the body asks to continue.
///
/// The body signals another pass by returning a result with
/// `continue_current_step` set ([`StepResult::stay`]); the engine keeps the
/// step current. `max_iterations` is the runaway guard — once the count
/// under `iteration_key` reaches it, the step fails instead of looping.
pub struct LoopStep {
    id: String,
    description: String,
    max_iterations: u64,
    run: Box<ProcessFn>,
}

impl LoopStep {
    pub fn new(
        id: impl Into<String>,
        run: impl Fn(&mut StepContext<'_>) -> StepResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            max_iterations: 100,
            run: Box::new(run),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn max_iterations(mut self, n: u64) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }

    fn iteration_key(&self) -> String {
        format!("__loop_count_{}", self.id)
    }
}

impl Step for LoopStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::Processing
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        format!("looping: {}", self.id)
    }

    fn execute(&self, _input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        let key = self.iteration_key();
        let count = ctx
            .data
            .get(&key)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if count >= self.max_iterations {
            ctx.data.remove(&key);
            return StepResult::failure(format!(
                "loop `{}` exceeded {} iterations",
                self.id, self.max_iterations
            ));
        }

        let result = (self.run)(ctx);
        if result.continue_current_step {
            ctx.data.set(&key, count + 1);
        } else {
            ctx.data.remove(&key);
        }
        result
    }
}

#[cfg(test)]
#[path = "compute_tests.rs"]
mod tests;
