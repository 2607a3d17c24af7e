// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM-processing step: delegates work to the external model and suspends
//! until the output key appears in session data.

use crate::result::StepResult;
use crate::step::{LlmRequest, Step, StepContext, StepType};
use aria_core::ContextMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Step that asks the external LLM to produce a value.
///
/// The engine publishes the built request; whoever serves it writes
/// `output_data_key` back into session data and re-drives the engine. The
/// step completes on the re-drive once the key is present.
pub struct LlmProcessingStep {
    id: String,
    description: String,
    task_description: String,
    prompt_template: String,
    /// Session-data keys copied into the request's input_data.
    input_keys: Vec<String>,
    output_data_key: String,
}

impl LlmProcessingStep {
    pub fn new(id: impl Into<String>, task_description: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            output_data_key: format!("{id}_output"),
            id,
            description: String::new(),
            task_description: task_description.into(),
            prompt_template: String::new(),
            input_keys: Vec::new(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn prompt_template(mut self, text: impl Into<String>) -> Self {
        self.prompt_template = text.into();
        self
    }

    pub fn input_key(mut self, key: impl Into<String>) -> Self {
        self.input_keys.push(key.into());
        self
    }

    pub fn output_data_key(mut self, key: impl Into<String>) -> Self {
        self.output_data_key = key.into();
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for LlmProcessingStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::LlmProcessing
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        self.task_description.clone()
    }

    fn should_auto_advance(&self) -> bool {
        // Advances only once the LLM has written the output key.
        false
    }

    fn llm_request(&self, data: &ContextMap) -> Option<LlmRequest> {
        let mut input_data = Map::new();
        for key in &self.input_keys {
            input_data.insert(key.clone(), data.get_or(key, Value::Null));
        }
        Some(LlmRequest {
            task_description: self.task_description.clone(),
            prompt: self.prompt_template.clone(),
            input_data,
            output_data_key: self.output_data_key.clone(),
            step_id: self.id.clone(),
        })
    }

    fn execute(&self, _input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        if ctx.data.has(&self.output_data_key) {
            let output = ctx.data.get_or(&self.output_data_key, Value::Null);
            return StepResult::success(format!("llm output ready: {}", self.output_data_key))
                .with_entry(&self.output_data_key, output);
        }
        // Output not yet populated: hold here until the LLM writes it.
        StepResult::success(format!("awaiting llm output: {}", self.output_data_key))
            .awaiting_llm()
            .stay()
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
