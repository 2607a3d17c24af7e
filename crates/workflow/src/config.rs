// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative workflow definitions from TOML.
//!
//! Two files describe a workflow: the catalogue entry (name, mode, review
//! policy, initial-parameter mapping) and the step graph (steps plus
//! transitions). The loader covers the declarative step subset; workflows
//! needing closures (processing bodies, conditionals) register builders in
//! code instead.

use crate::definition::{Guard, Transition, WorkflowDefinition, WorkflowMode};
use crate::error::DefinitionError;
use crate::templates::{
    ConfirmationStep, FileSelectionStep, InputStep, LlmProcessingStep, MonitorCreationStep,
    PeriodicCheckStep, ScheduledTriggerStep, SelectionStep, SystemActionStep,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

/// Catalogue file: workflow type → policy + initial-parameter mapping.
#[derive(Debug, Deserialize)]
pub struct CatalogueFile {
    #[serde(default)]
    pub workflows: IndexMap<String, CatalogueEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogueEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_mode")]
    pub workflow_mode: WorkflowMode,
    #[serde(default)]
    pub requires_llm_review: bool,
    #[serde(default = "default_true")]
    pub auto_advance_on_approval: bool,
    #[serde(default)]
    pub initial_params: IndexMap<String, InitialParam>,
}

fn default_mode() -> WorkflowMode {
    WorkflowMode::Direct
}

fn default_true() -> bool {
    true
}

/// Maps an incoming parameter to a step's data key, with inference rules
/// for when the parameter itself is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct InitialParam {
    pub maps_to_step: String,
    #[serde(default)]
    pub infer_from: Vec<InferRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferRule {
    /// Parameter inspected by this rule.
    pub param: String,
    #[serde(default)]
    pub condition: InferCondition,
    /// Literal to use instead of the inspected parameter's value.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InferCondition {
    #[default]
    Exists,
}

/// Apply an entry's parameter mapping to the data supplied at start.
///
/// Supplied keys pass through; each declared parameter (or the first
/// inference rule whose inspected parameter exists) additionally lands
/// under its step's data key.
pub fn apply_initial_params(
    entry: &CatalogueEntry,
    supplied: &Map<String, Value>,
) -> Map<String, Value> {
    let mut out = supplied.clone();
    for (param, mapping) in &entry.initial_params {
        if let Some(value) = supplied.get(param) {
            out.insert(mapping.maps_to_step.clone(), value.clone());
            continue;
        }
        for rule in &mapping.infer_from {
            match rule.condition {
                InferCondition::Exists => {
                    if let Some(found) = supplied.get(&rule.param) {
                        let value = rule.value.clone().unwrap_or_else(|| found.clone());
                        tracing::debug!(
                            param = %param,
                            from = %rule.param,
                            reason = %rule.reason,
                            "inferred initial parameter"
                        );
                        out.insert(mapping.maps_to_step.clone(), value);
                        break;
                    }
                }
            }
        }
    }
    out
}

/// Step-graph file for one workflow.
#[derive(Debug, Deserialize)]
pub struct GraphFile {
    pub workflow_type: String,
    pub entry_point: String,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

/// Declarative step record, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepSpec {
    Input {
        id: String,
        prompt: String,
        #[serde(default)]
        data_key: Option<String>,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        skip_if_present: bool,
        #[serde(default)]
        description: String,
    },
    FileSelection {
        id: String,
        prompt: String,
        #[serde(default)]
        data_key: Option<String>,
        #[serde(default)]
        skip_if_present: bool,
        #[serde(default)]
        extensions: Vec<String>,
        #[serde(default)]
        description: String,
    },
    Selection {
        id: String,
        prompt: String,
        choices: Vec<String>,
        #[serde(default)]
        data_key: Option<String>,
        #[serde(default)]
        default_choice: Option<usize>,
        #[serde(default)]
        description: String,
    },
    Confirmation {
        id: String,
        message: String,
        #[serde(default)]
        description: String,
    },
    System {
        id: String,
        action: String,
        #[serde(default)]
        params: Map<String, Value>,
        #[serde(default)]
        param_keys: Vec<String>,
        #[serde(default)]
        result_key: Option<String>,
        #[serde(default)]
        description: String,
    },
    LlmProcessing {
        id: String,
        task_description: String,
        #[serde(default)]
        prompt_template: String,
        #[serde(default)]
        input_keys: Vec<String>,
        #[serde(default)]
        output_data_key: Option<String>,
        #[serde(default)]
        description: String,
    },
    ScheduledTrigger {
        id: String,
        fire_at_key: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        message_key: Option<String>,
        #[serde(default)]
        description: String,
    },
    MonitorCreation {
        id: String,
        workflow_type: String,
        #[serde(default = "default_check_interval_secs")]
        check_interval_secs: u64,
        #[serde(default)]
        metadata_keys: Vec<String>,
        #[serde(default)]
        description: String,
    },
    PeriodicCheck {
        id: String,
        check_name: String,
        #[serde(default = "default_check_interval_secs")]
        check_interval_secs: u64,
        #[serde(default)]
        description: String,
    },
}

fn default_check_interval_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize)]
pub struct TransitionSpec {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub guard: Option<GuardSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardSpec {
    KeyEquals { key: String, value: Value },
    KeyPresent { key: String },
    ResultSuccess,
}

impl GuardSpec {
    fn build(&self) -> Guard {
        match self {
            GuardSpec::KeyEquals { key, value } => Guard::KeyEquals {
                key: key.clone(),
                value: value.clone(),
            },
            GuardSpec::KeyPresent { key } => Guard::KeyPresent { key: key.clone() },
            GuardSpec::ResultSuccess => Guard::ResultSuccess,
        }
    }
}

impl StepSpec {
    fn build(&self) -> std::sync::Arc<dyn crate::step::Step> {
        match self {
            StepSpec::Input {
                id,
                prompt,
                data_key,
                optional,
                skip_if_present,
                description,
            } => {
                let mut step = InputStep::new(id, prompt)
                    .optional(*optional)
                    .skip_if_present(*skip_if_present)
                    .description(description.clone());
                if let Some(key) = data_key {
                    step = step.data_key(key);
                }
                step.arc()
            }
            StepSpec::FileSelection {
                id,
                prompt,
                data_key,
                skip_if_present,
                extensions,
                description,
            } => {
                let mut step = FileSelectionStep::new(id, prompt)
                    .skip_if_present(*skip_if_present)
                    .description(description.clone());
                if let Some(key) = data_key {
                    step = step.data_key(key);
                }
                for ext in extensions {
                    step = step.extension(ext);
                }
                step.arc()
            }
            StepSpec::Selection {
                id,
                prompt,
                choices,
                data_key,
                default_choice,
                description,
            } => {
                let mut step = SelectionStep::new(id, prompt, choices.clone())
                    .description(description.clone());
                if let Some(key) = data_key {
                    step = step.data_key(key);
                }
                if let Some(d) = default_choice {
                    step = step.default_choice(*d);
                }
                step.arc()
            }
            StepSpec::Confirmation { id, message, description } => ConfirmationStep::new(id, message)
                .description(description.clone())
                .arc(),
            StepSpec::System {
                id,
                action,
                params,
                param_keys,
                result_key,
                description,
            } => {
                let mut step = SystemActionStep::new(id, action).description(description.clone());
                for (k, v) in params {
                    step = step.param(k.clone(), v.clone());
                }
                for key in param_keys {
                    step = step.param_from_data(key);
                }
                if let Some(key) = result_key {
                    step = step.result_key(key);
                }
                step.arc()
            }
            StepSpec::LlmProcessing {
                id,
                task_description,
                prompt_template,
                input_keys,
                output_data_key,
                description,
            } => {
                let mut step = LlmProcessingStep::new(id, task_description)
                    .prompt_template(prompt_template.clone())
                    .description(description.clone());
                for key in input_keys {
                    step = step.input_key(key);
                }
                if let Some(key) = output_data_key {
                    step = step.output_data_key(key);
                }
                step.arc()
            }
            StepSpec::ScheduledTrigger {
                id,
                fire_at_key,
                message,
                message_key,
                description,
            } => {
                let mut step = ScheduledTriggerStep::new(id, fire_at_key)
                    .message(message.clone())
                    .description(description.clone());
                if let Some(key) = message_key {
                    step = step.message_key(key);
                }
                step.arc()
            }
            StepSpec::MonitorCreation {
                id,
                workflow_type,
                check_interval_secs,
                metadata_keys,
                description,
            } => {
                let mut step = MonitorCreationStep::new(id, workflow_type)
                    .check_interval(Duration::from_secs(*check_interval_secs))
                    .description(description.clone());
                for key in metadata_keys {
                    step = step.metadata_from_data(key);
                }
                step.arc()
            }
            StepSpec::PeriodicCheck {
                id,
                check_name,
                check_interval_secs,
                description,
            } => PeriodicCheckStep::new(id, check_name, Duration::from_secs(*check_interval_secs))
                .description(description.clone())
                .arc(),
        }
    }
}

/// Load a catalogue file.
pub fn load_catalogue(path: &Path) -> Result<CatalogueFile, DefinitionError> {
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

/// Load a step-graph file.
pub fn load_graph(path: &Path) -> Result<GraphFile, DefinitionError> {
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

/// Assemble a validated definition from a catalogue entry and its graph.
pub fn build_definition(
    workflow_type: &str,
    entry: &CatalogueEntry,
    graph: &GraphFile,
) -> Result<WorkflowDefinition, DefinitionError> {
    let mut def = WorkflowDefinition::new(workflow_type, &entry.name)
        .description(entry.description.clone())
        .mode(entry.workflow_mode)
        .requires_llm_review(entry.requires_llm_review)
        .auto_advance_on_approval(entry.auto_advance_on_approval)
        .entry_point(&graph.entry_point);

    for spec in &graph.steps {
        def = def.add_step(spec.build());
    }
    for t in &graph.transitions {
        let transition = match &t.guard {
            Some(guard) => Transition::guarded(&t.to, guard.build()),
            None => Transition::unconditional(&t.to),
        };
        def = def.add_transition(&t.from, transition);
    }

    def.validate()?;
    Ok(def)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
