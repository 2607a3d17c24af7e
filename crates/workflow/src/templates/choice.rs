// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive choice steps: selection from a fixed list and yes/no
//! confirmation.

use crate::result::StepResult;
use crate::step::{Step, StepContext, StepType};
use aria_core::ContextMap;
use std::sync::Arc;

/// Pick one option from a declared list, by 1-based index or by label.
pub struct SelectionStep {
    id: String,
    prompt_text: String,
    data_key: String,
    description: String,
    choices: Vec<String>,
    default_choice: Option<usize>,
    skip_if_present: bool,
}

impl SelectionStep {
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        choices: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let id = id.into();
        Self {
            data_key: id.clone(),
            id,
            prompt_text: prompt.into(),
            description: String::new(),
            choices: choices.into_iter().map(Into::into).collect(),
            default_choice: None,
            skip_if_present: false,
        }
    }

    pub fn data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = key.into();
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// 1-based index used when the user answers with nothing.
    pub fn default_choice(mut self, index: usize) -> Self {
        self.default_choice = Some(index);
        self
    }

    pub fn skip_if_present(mut self, yes: bool) -> Self {
        self.skip_if_present = yes;
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }

    fn resolve(&self, answer: &str) -> Option<usize> {
        if let Ok(n) = answer.parse::<usize>() {
            if (1..=self.choices.len()).contains(&n) {
                return Some(n);
            }
            return None;
        }
        self.choices
            .iter()
            .position(|c| c.eq_ignore_ascii_case(answer))
            .map(|i| i + 1)
    }
}

impl Step for SelectionStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::Interactive
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        let mut out = self.prompt_text.clone();
        for (i, choice) in self.choices.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, choice));
        }
        out
    }

    fn should_skip(&self, data: &ContextMap) -> bool {
        self.skip_if_present && data.has(&self.data_key)
    }

    fn execute(&self, input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        if self.should_skip(ctx.data) {
            let existing = ctx.data.get_or(&self.data_key, serde_json::Value::Null);
            return StepResult::success("used existing selection")
                .with_entry(&self.data_key, existing);
        }

        let trimmed = input.map(str::trim).unwrap_or_default();
        let chosen = if trimmed.is_empty() {
            match self.default_choice {
                Some(d) => d,
                None => return StepResult::failure("a selection is required"),
            }
        } else {
            match self.resolve(trimmed) {
                Some(n) => n,
                None => {
                    return StepResult::failure(format!(
                        "invalid selection `{trimmed}`; choose 1-{}",
                        self.choices.len()
                    ))
                }
            }
        };

        ctx.data.set(&self.data_key, chosen as i64);
        StepResult::success(format!("selected: {}", self.choices[chosen - 1]))
            .with_entry(&self.data_key, chosen as i64)
    }
}

/// Yes/no gate. A negative answer cancels the workflow.
pub struct ConfirmationStep {
    id: String,
    message: String,
    description: String,
    confirm_message: String,
    cancel_message: String,
}

impl ConfirmationStep {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            description: String::new(),
            confirm_message: "confirmed".to_string(),
            cancel_message: "cancelled by user".to_string(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn confirm_message(mut self, text: impl Into<String>) -> Self {
        self.confirm_message = text.into();
        self
    }

    pub fn cancel_message(mut self, text: impl Into<String>) -> Self {
        self.cancel_message = text.into();
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

const YES_ANSWERS: [&str; 5] = ["y", "yes", "ok", "confirm", "sure"];
const NO_ANSWERS: [&str; 4] = ["n", "no", "cancel", "abort"];

impl Step for ConfirmationStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::Interactive
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        format!("{} (yes/no)", self.message)
    }

    fn execute(&self, input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        let answer = input.map(str::trim).unwrap_or_default().to_lowercase();
        if YES_ANSWERS.contains(&answer.as_str()) {
            ctx.data.set(&self.id, true);
            StepResult::success(self.confirm_message.clone()).with_entry(&self.id, true)
        } else if NO_ANSWERS.contains(&answer.as_str()) {
            StepResult::cancel_workflow(self.cancel_message.clone())
        } else {
            StepResult::failure("please answer yes or no")
        }
    }
}

#[cfg(test)]
#[path = "choice_tests.rs"]
mod tests;
