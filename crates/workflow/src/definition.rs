// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definitions: the step map, the transition table, and the
//! review/advance policy the engine interprets.

use crate::error::DefinitionError;
use crate::result::StepResult;
use crate::step::Step;
use aria_core::ContextMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Sentinel transition target that terminates the workflow.
pub const END: &str = "END";

/// How a workflow runs once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    /// Interactive, driven by the conversation.
    Direct,
    /// Submitted to the background executor; must be non-interactive.
    Background,
}

aria_core::simple_display! {
    WorkflowMode {
        Direct => "direct",
        Background => "background",
    }
}

/// Where a transition leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTarget {
    Step(String),
    End,
}

impl StepTarget {
    pub fn parse(s: &str) -> Self {
        if s == END {
            Self::End
        } else {
            Self::Step(s.to_string())
        }
    }

    pub fn as_step(&self) -> Option<&str> {
        match self {
            Self::Step(id) => Some(id),
            Self::End => None,
        }
    }
}

/// Predicate deciding whether a transition accepts a step result.
///
/// Declarative variants cover everything the definition files can express;
/// `Custom` is for workflows built in code.
#[derive(Clone)]
pub enum Guard {
    /// Session data at `key` equals `value`.
    KeyEquals { key: String, value: Value },
    /// Session data contains `key` (empty string counts).
    KeyPresent { key: String },
    /// The step result reported success.
    ResultSuccess,
    Custom(Arc<dyn Fn(&StepResult, &ContextMap) -> bool + Send + Sync>),
}

impl Guard {
    pub fn accepts(&self, result: &StepResult, data: &ContextMap) -> bool {
        match self {
            Guard::KeyEquals { key, value } => data.get(key) == Some(value),
            Guard::KeyPresent { key } => data.has(key),
            Guard::ResultSuccess => result.success,
            Guard::Custom(f) => f(result, data),
        }
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Guard::KeyEquals { key, value } => write!(f, "KeyEquals({key} == {value})"),
            Guard::KeyPresent { key } => write!(f, "KeyPresent({key})"),
            Guard::ResultSuccess => write!(f, "ResultSuccess"),
            Guard::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// One edge in the step graph.
#[derive(Debug, Clone)]
pub struct Transition {
    pub to: StepTarget,
    pub guard: Option<Guard>,
}

impl Transition {
    pub fn unconditional(to: impl AsRef<str>) -> Self {
        Self {
            to: StepTarget::parse(to.as_ref()),
            guard: None,
        }
    }

    pub fn guarded(to: impl AsRef<str>, guard: Guard) -> Self {
        Self {
            to: StepTarget::parse(to.as_ref()),
            guard: Some(guard),
        }
    }
}

/// A declarative workflow: steps, transitions, entry point, and policy.
#[derive(Clone)]
pub struct WorkflowDefinition {
    pub workflow_type: String,
    pub name: String,
    pub description: String,
    pub mode: WorkflowMode,
    pub requires_llm_review: bool,
    pub auto_advance_on_approval: bool,
    steps: IndexMap<String, Arc<dyn Step>>,
    transitions: IndexMap<String, Vec<Transition>>,
    entry_point: String,
    pub metadata: Map<String, Value>,
}

impl WorkflowDefinition {
    pub fn new(workflow_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            workflow_type: workflow_type.into(),
            name: name.into(),
            description: String::new(),
            mode: WorkflowMode::Direct,
            requires_llm_review: false,
            auto_advance_on_approval: true,
            steps: IndexMap::new(),
            transitions: IndexMap::new(),
            entry_point: String::new(),
            metadata: Map::new(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn mode(mut self, mode: WorkflowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn requires_llm_review(mut self, yes: bool) -> Self {
        self.requires_llm_review = yes;
        self
    }

    pub fn auto_advance_on_approval(mut self, yes: bool) -> Self {
        self.auto_advance_on_approval = yes;
        self
    }

    pub fn add_step(mut self, step: Arc<dyn Step>) -> Self {
        let id = step.id().to_string();
        self.steps.insert(id, step);
        self
    }

    pub fn add_transition(mut self, from: impl Into<String>, transition: Transition) -> Self {
        self.transitions.entry(from.into()).or_default().push(transition);
        self
    }

    pub fn entry_point(mut self, step: impl Into<String>) -> Self {
        self.entry_point = step.into();
        self
    }

    pub fn metadata_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn step(&self, id: &str) -> Option<&Arc<dyn Step>> {
        self.steps.get(id)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn entry(&self) -> &str {
        &self.entry_point
    }

    pub fn transitions_from(&self, step: &str) -> &[Transition] {
        self.transitions.get(step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One-line overview of the step graph, for the LLM's orientation.
    pub fn overview(&self) -> Vec<Map<String, Value>> {
        self.steps
            .values()
            .map(|s| {
                let mut m = Map::new();
                m.insert("step_id".to_string(), Value::from(s.id()));
                m.insert("step_type".to_string(), Value::from(s.step_type().to_string()));
                m.insert("description".to_string(), Value::from(s.description()));
                m
            })
            .collect()
    }

    /// Check structural invariants: the entry point exists and every
    /// transition endpoint is a known step or `END`.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if !self.steps.contains_key(&self.entry_point) {
            return Err(DefinitionError::MissingEntryPoint(self.entry_point.clone()));
        }
        for (from, transitions) in &self.transitions {
            if !self.steps.contains_key(from) {
                return Err(DefinitionError::UnknownTransitionSource(from.clone()));
            }
            for t in transitions {
                if let StepTarget::Step(target) = &t.to {
                    if !self.steps.contains_key(target) {
                        return Err(DefinitionError::UnknownTransitionTarget {
                            from: from.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for WorkflowDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDefinition")
            .field("workflow_type", &self.workflow_type)
            .field("mode", &self.mode)
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
