// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conditional branch step: selects a branch by a prior step's data and
//! runs the branch steps sequentially in-engine.

use crate::result::StepResult;
use crate::step::{Step, StepContext, StepType};
use aria_core::ContextMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Branch dispatch on the value stored by an earlier step.
///
/// An empty branch succeeds immediately. A branch step that is interactive
/// and not skippable pauses execution: the resume index is persisted in
/// session data and the result jumps (`skip_to`) to the branch step, which
/// must also exist in the definition; its outgoing transition leads back
/// here and execution resumes past it.
pub struct ConditionalStep {
    id: String,
    description: String,
    selector_key: String,
    branches: BTreeMap<String, Vec<Arc<dyn Step>>>,
}

impl ConditionalStep {
    pub fn new(id: impl Into<String>, selector_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            selector_key: selector_key.into(),
            branches: BTreeMap::new(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Declare a branch for a selector value. Values are matched on their
    /// canonical string form (numbers render without quotes).
    pub fn branch(mut self, value: impl Into<String>, steps: Vec<Arc<dyn Step>>) -> Self {
        self.branches.insert(value.into(), steps);
        self
    }

    /// Branch steps, exposed so definition builders can register them in
    /// the step map too (required for the pause-and-jump protocol).
    pub fn branch_steps(&self) -> impl Iterator<Item = &Arc<dyn Step>> {
        self.branches.values().flatten()
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }

    fn resume_key(&self) -> String {
        format!("__branch_resume_{}", self.id)
    }

    fn selector_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Step for ConditionalStep {
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
        format!("evaluating branch on `{}`", self.selector_key)
    }

    fn execute(&self, input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        let resume_key = self.resume_key();
        let resume_index = ctx
            .data
            .get(&resume_key)
            .and_then(Value::as_u64)
            .map(|n| n as usize);

        let Some(selector) = ctx.data.get(&self.selector_key).cloned() else {
            return StepResult::failure(format!(
                "no selection value under `{}`",
                self.selector_key
            ));
        };
        let selector = Self::selector_string(&selector);

        let Some(branch) = self.branches.get(&selector) else {
            return StepResult::failure(format!("no branch defined for `{selector}`"));
        };

        if branch.is_empty() {
            return StepResult::success(format!("branch {selector}: nothing to do"));
        }

        let start = match resume_index {
            Some(i) => {
                ctx.data.remove(&resume_key);
                i
            }
            None => 0,
        };

        let mut aggregated = serde_json::Map::new();
        for (i, step) in branch.iter().enumerate().skip(start) {
            if step.step_type() == StepType::Interactive && !step.should_skip(ctx.data) {
                // Pause: remember where to pick up, jump to the branch step.
                ctx.data.set(&resume_key, (i + 1) as u64);
                return StepResult::skip_to(
                    step.id(),
                    format!("branch step `{}` needs input", step.id()),
                );
            }

            let result = step.execute(input, ctx);
            if !result.success {
                return StepResult::failure(format!(
                    "branch step `{}` failed: {}",
                    step.id(),
                    result.message
                ));
            }
            for (k, v) in &result.data {
                ctx.data.set(k.clone(), v.clone());
                aggregated.insert(k.clone(), v.clone());
            }
        }

        StepResult::success(format!("branch {selector} complete")).with_data(aggregated)
    }
}

#[cfg(test)]
#[path = "conditional_tests.rs"]
mod tests;
