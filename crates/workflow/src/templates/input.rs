// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive input steps: free text and file paths.

use crate::result::StepResult;
use crate::step::{Step, StepContext, StepPriority, StepType};
use aria_core::ContextMap;
use std::sync::Arc;

/// Free-text input step.
///
/// With `skip_if_present`, an existing value under the data key — empty
/// string included — satisfies the step without prompting.
pub struct InputStep {
    id: String,
    prompt_text: String,
    data_key: String,
    description: String,
    optional: bool,
    skip_if_present: bool,
    requirements: Vec<String>,
}

impl InputStep {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            data_key: id.clone(),
            id,
            prompt_text: prompt.into(),
            description: String::new(),
            optional: false,
            skip_if_present: false,
            requirements: Vec::new(),
        }
    }

    /// Store the input under a different session-data key than the step id.
    pub fn data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = key.into();
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Optional inputs accept an empty answer (stored as an empty string).
    pub fn optional(mut self, yes: bool) -> Self {
        self.optional = yes;
        self
    }

    pub fn skip_if_present(mut self, yes: bool) -> Self {
        self.skip_if_present = yes;
        self
    }

    pub fn requirement(mut self, key: impl Into<String>) -> Self {
        self.requirements.push(key.into());
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for InputStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::Interactive
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn priority(&self) -> StepPriority {
        if self.optional {
            StepPriority::Optional
        } else {
            StepPriority::Required
        }
    }

    fn requirements(&self) -> &[String] {
        &self.requirements
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        if self.optional {
            format!("{} (leave empty to skip)", self.prompt_text)
        } else {
            self.prompt_text.clone()
        }
    }

    fn should_skip(&self, data: &ContextMap) -> bool {
        self.skip_if_present && data.has(&self.data_key)
    }

    fn execute(&self, input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        if self.should_skip(ctx.data) {
            let existing = ctx.data.get_or(&self.data_key, serde_json::Value::from(""));
            let shown = existing.as_str().unwrap_or_default().to_string();
            return StepResult::success(format!("used existing data: {shown}"))
                .with_entry(&self.data_key, existing);
        }

        let trimmed = input.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            if self.optional {
                ctx.data.set(&self.data_key, "");
                return StepResult::success("input skipped").with_entry(&self.data_key, "");
            }
            return StepResult::failure("input required");
        }

        ctx.data.set(&self.data_key, trimmed);
        StepResult::success(format!("received: {trimmed}")).with_entry(&self.data_key, trimmed)
    }
}

/// Path input step: like [`InputStep`] but validates the answer looks like
/// a usable path and can filter by extension.
pub struct FileSelectionStep {
    inner: InputStep,
    extensions: Vec<String>,
}

impl FileSelectionStep {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            inner: InputStep::new(id, prompt),
            extensions: Vec::new(),
        }
    }

    pub fn data_key(mut self, key: impl Into<String>) -> Self {
        self.inner = self.inner.data_key(key);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.inner = self.inner.description(text);
        self
    }

    pub fn skip_if_present(mut self, yes: bool) -> Self {
        self.inner = self.inner.skip_if_present(yes);
        self
    }

    /// Accept only paths ending in one of these extensions (no dot).
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for FileSelectionStep {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn step_type(&self) -> StepType {
        StepType::Interactive
    }

    fn description(&self) -> &str {
        Step::description(&self.inner)
    }

    fn prompt(&self, data: &ContextMap) -> String {
        self.inner.prompt(data)
    }

    fn should_skip(&self, data: &ContextMap) -> bool {
        self.inner.should_skip(data)
    }

    fn execute(&self, input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        if self.inner.should_skip(ctx.data) {
            return self.inner.execute(input, ctx);
        }

        let trimmed = input.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return StepResult::failure("a file path is required");
        }
        if !self.extensions.is_empty() {
            let matched = self
                .extensions
                .iter()
                .any(|ext| trimmed.to_lowercase().ends_with(&format!(".{}", ext.to_lowercase())));
            if !matched {
                return StepResult::failure(format!(
                    "unsupported file type; expected one of: {}",
                    self.extensions.join(", ")
                ));
            }
        }
        self.inner.execute(Some(trimmed), ctx)
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
