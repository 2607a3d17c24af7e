// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow registry: type name → definition builder.
//!
//! Builders run fresh per started workflow, so engines never share step
//! state. Declarative (TOML) workflows and code-built workflows register
//! side by side.

use crate::config::{apply_initial_params, CatalogueEntry};
use crate::definition::WorkflowDefinition;
use crate::error::DefinitionError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

type DefinitionBuilder = Arc<dyn Fn() -> WorkflowDefinition + Send + Sync>;

struct Registered {
    builder: DefinitionBuilder,
    catalogue: Option<CatalogueEntry>,
}

/// All workflow types the runtime can start.
#[derive(Default)]
pub struct WorkflowRegistry {
    inner: RwLock<IndexMap<String, Registered>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a code-built workflow.
    pub fn register(
        &self,
        workflow_type: impl Into<String>,
        builder: impl Fn() -> WorkflowDefinition + Send + Sync + 'static,
    ) {
        self.inner.write().insert(
            workflow_type.into(),
            Registered {
                builder: Arc::new(builder),
                catalogue: None,
            },
        );
    }

    /// Register a declaratively loaded workflow together with its
    /// catalogue entry (kept for initial-parameter inference).
    pub fn register_catalogue(
        &self,
        workflow_type: impl Into<String>,
        entry: CatalogueEntry,
        builder: impl Fn() -> WorkflowDefinition + Send + Sync + 'static,
    ) {
        self.inner.write().insert(
            workflow_type.into(),
            Registered {
                builder: Arc::new(builder),
                catalogue: Some(entry),
            },
        );
    }

    pub fn contains(&self, workflow_type: &str) -> bool {
        self.inner.read().contains_key(workflow_type)
    }

    pub fn types(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// Build and validate a fresh definition for a workflow type.
    pub fn build(&self, workflow_type: &str) -> Result<Arc<WorkflowDefinition>, DefinitionError> {
        let inner = self.inner.read();
        let registered = inner
            .get(workflow_type)
            .ok_or_else(|| DefinitionError::UnknownWorkflow(workflow_type.to_string()))?;
        let definition = (registered.builder)();
        definition.validate()?;
        Ok(Arc::new(definition))
    }

    /// Session data to seed at start: supplied keys pass through, plus the
    /// catalogue's parameter mapping and inference when one is registered.
    pub fn initial_data(
        &self,
        workflow_type: &str,
        supplied: &Map<String, Value>,
    ) -> Map<String, Value> {
        let inner = self.inner.read();
        match inner.get(workflow_type).and_then(|r| r.catalogue.as_ref()) {
            Some(entry) => apply_initial_params(entry, supplied),
            None => supplied.clone(),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
