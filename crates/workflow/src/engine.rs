// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow engine: one per active workflow session.
//!
//! The engine interprets a [`WorkflowDefinition`] against the session's
//! working data. Suspension is explicit: an interactive step returns
//! control, an LLM-processing step holds until its output key appears, and
//! a review gate holds the step result until `handle_review` is called.
//! There is no implicit re-entry.

use crate::definition::{StepTarget, WorkflowDefinition};
use crate::error::EngineError;
use crate::host::HostActions;
use crate::result::StepResult;
use crate::step::{Step, StepContext, StepType};
use aria_core::{event_data, ContextMap, EventBus, EventKind, SessionId, SessionStatus, SessionStore};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Runaway guard on recursive auto-advance within one call.
const MAX_AUTO_ADVANCES: usize = 100;

/// LLM verdict on a review-gated step result.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewAction {
    Approve,
    Modify(Map<String, Value>),
    Cancel,
}

/// Serializable engine snapshot for status queries.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineStatus {
    pub workflow_type: String,
    pub session_id: String,
    pub current_step: Option<String>,
    pub executed_steps: Vec<String>,
    pub awaiting_llm_review: bool,
    pub requires_input: bool,
    pub complete: bool,
    pub failed: bool,
    pub cancelled: bool,
}

/// Interprets one workflow for one session.
pub struct WorkflowEngine {
    definition: Arc<WorkflowDefinition>,
    session_id: SessionId,
    sessions: Arc<SessionStore>,
    bus: Arc<EventBus>,
    host: Arc<dyn HostActions>,
    current: Option<String>,
    executed: Vec<String>,
    awaiting_review: bool,
    pending_review: Option<(String, StepResult)>,
    suppress_events: bool,
    failed: bool,
    cancelled: bool,
}

impl WorkflowEngine {
    pub fn new(
        definition: Arc<WorkflowDefinition>,
        session_id: SessionId,
        sessions: Arc<SessionStore>,
        bus: Arc<EventBus>,
        host: Arc<dyn HostActions>,
    ) -> Self {
        let entry = definition.entry().to_string();
        sessions.set_current_step(&session_id, Some(&entry));
        Self {
            definition,
            session_id,
            sessions,
            bus,
            host,
            current: Some(entry),
            executed: Vec::new(),
            awaiting_review: false,
            pending_review: None,
            suppress_events: false,
            failed: false,
            cancelled: false,
        }
    }

    pub fn definition(&self) -> &Arc<WorkflowDefinition> {
        &self.definition
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn current_step(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn executed_steps(&self) -> &[String] {
        &self.executed
    }

    pub fn awaiting_llm_review(&self) -> bool {
        self.awaiting_review
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_none() || self.failed || self.cancelled
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Review context held at the gate, when the engine is gated.
    pub fn pending_review_data(&self) -> Option<Map<String, Value>> {
        let (step_id, result) = self.pending_review.as_ref()?;
        let mut data = result.llm_review_data.clone().unwrap_or_default();
        data.insert("step_id".to_string(), Value::from(step_id.as_str()));
        data.insert("message".to_string(), Value::from(result.message.as_str()));
        data.insert("data".to_string(), Value::Object(result.data.clone()));
        Some(data)
    }

    fn session_data(&self) -> ContextMap {
        self.sessions
            .get(&self.session_id)
            .map(|s| s.data)
            .unwrap_or_default()
    }

    /// True when the engine is parked on a step that genuinely needs input.
    pub fn requires_input(&self) -> bool {
        if self.awaiting_review || self.is_complete() {
            return false;
        }
        let data = self.session_data();
        self.current
            .as_deref()
            .and_then(|id| self.definition.step(id))
            .map(|step| step.step_type() == StepType::Interactive && !step.should_skip(&data))
            .unwrap_or(false)
    }

    /// Prompt of the current step, when one exists.
    pub fn prompt(&self) -> Option<String> {
        let data = self.session_data();
        self.current
            .as_deref()
            .and_then(|id| self.definition.step(id))
            .map(|step| step.prompt(&data))
    }

    /// First declared transition target from the current step.
    pub fn peek_next_step(&self) -> Option<String> {
        let current = self.current.as_deref()?;
        self.definition
            .transitions_from(current)
            .first()
            .and_then(|t| t.to.as_step())
            .map(str::to_string)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            workflow_type: self.definition.workflow_type.clone(),
            session_id: self.session_id.to_string(),
            current_step: self.current.clone(),
            executed_steps: self.executed.clone(),
            awaiting_llm_review: self.awaiting_review,
            requires_input: self.requires_input(),
            complete: self.is_complete(),
            failed: self.failed,
            cancelled: self.cancelled,
        }
    }

    /// Effective-first-step discovery.
    ///
    /// Drives through every step executable without user input, with
    /// per-step event publication suppressed so the pre-flight does not
    /// flood subscribers. Terminal events (completion, failure, cancel)
    /// still publish; on landing at a genuine interactive step or a review
    /// gate, exactly one `workflow_requires_input` is published here.
    pub fn start(&mut self) -> Result<StepResult, EngineError> {
        self.suppress_events = true;
        let result = self.drive(None, 0);
        self.suppress_events = false;

        let result = result?;
        if self.awaiting_review {
            self.publish_requires_input("llm_review");
        } else if self.requires_input() {
            self.publish_requires_input("user");
            let _ = self.sessions.set_status(&self.session_id, SessionStatus::Waiting);
        } else if result.requires_llm_processing {
            if let Some(step) = self.current.as_deref().and_then(|id| self.definition.step(id)) {
                let step = Arc::clone(step);
                self.publish_llm_request(&step);
            }
        }
        Ok(result)
    }

    /// Feed input to the current step and advance as far as possible.
    pub fn process_input(&mut self, input: Option<&str>) -> Result<StepResult, EngineError> {
        if self.awaiting_review {
            return Err(EngineError::AwaitingReview);
        }
        self.drive(input, 0)
    }

    /// External cancel (user or tool call). Terminal immediately at the
    /// engine; session teardown still waits for the cycle boundary.
    pub fn cancel(&mut self, reason: &str) -> StepResult {
        self.cancelled = true;
        self.awaiting_review = false;
        self.pending_review = None;
        let result = StepResult::cancel_workflow(reason);
        self.publish_cancelled(reason);
        result
    }

    /// Resolve the LLM's verdict on a gated step result.
    pub fn handle_review(&mut self, action: ReviewAction) -> Result<StepResult, EngineError> {
        let (step_id, pending) = self
            .pending_review
            .take()
            .ok_or(EngineError::NoPendingReview)?;
        self.awaiting_review = false;

        match action {
            ReviewAction::Approve => {
                self.finish_step(&step_id, &pending);
                if self.is_complete() {
                    return Ok(pending);
                }
                if self.requires_input() {
                    self.publish_requires_input("user");
                    let _ = self.sessions.set_status(&self.session_id, SessionStatus::Waiting);
                    return Ok(pending);
                }
                if self.definition.auto_advance_on_approval {
                    return self.drive(None, 0);
                }
                Ok(pending)
            }
            ReviewAction::Modify(params) => {
                // Apply the modified parameters, then run the step again.
                self.sessions.with_session_data(&self.session_id, |data| {
                    data.merge(&params);
                })?;
                self.drive(None, 0)
            }
            ReviewAction::Cancel => {
                self.cancelled = true;
                let result = StepResult::cancel_workflow("cancelled by llm review");
                self.publish_cancelled(&result.message);
                Ok(result)
            }
        }
    }

    /// Execute the current step and advance through auto-advancing
    /// successors. The single state-machine turn of the engine.
    fn drive(&mut self, input: Option<&str>, depth: usize) -> Result<StepResult, EngineError> {
        if depth >= MAX_AUTO_ADVANCES {
            self.failed = true;
            let result = StepResult::failure("auto-advance limit exceeded");
            self.publish_failed(&result.message);
            return Ok(result);
        }

        let Some(step_id) = self.current.clone() else {
            return Ok(StepResult::complete_workflow("workflow already complete"));
        };
        let step = Arc::clone(self.definition.step(&step_id).ok_or_else(|| {
            EngineError::UnknownStep {
                step: self.definition.workflow_type.clone(),
                target: step_id.clone(),
            }
        })?);

        // An interactive step with no input and no satisfying data suspends
        // the engine; the caller relays the prompt.
        let data = self.session_data();
        if step.step_type() == StepType::Interactive && input.is_none() && !step.should_skip(&data)
        {
            // Polling a parked engine; the arrival event was published when
            // the engine first landed here.
            let _ = self.sessions.set_status(&self.session_id, SessionStatus::Waiting);
            return Ok(StepResult::success(step.prompt(&data)).stay());
        }

        // Required data must be present (empty string counts as present).
        for req in step.requirements() {
            if !data.has(req) {
                self.failed = true;
                let result = StepResult::failure(format!("missing required data: {req}"));
                self.publish_failed(&result.message);
                return Ok(result);
            }
        }

        let _ = self.sessions.set_status(&self.session_id, SessionStatus::Executing);

        // Skippable interactive steps execute with no input to emit their
        // "used existing data" result.
        let effective_input =
            if step.step_type() == StepType::Interactive && step.should_skip(&data) {
                None
            } else {
                input
            };

        let host = Arc::clone(&self.host);
        let session_id = self.session_id;
        let result = self.sessions.with_session_data(&self.session_id, |data| {
            let mut ctx = StepContext {
                session_id,
                data,
                host: host.as_ref(),
            };
            step.execute(effective_input, &mut ctx)
        })?;

        tracing::debug!(
            workflow = %self.definition.workflow_type,
            step = %step_id,
            success = result.success,
            "step executed"
        );

        if result.cancel {
            self.cancelled = true;
            self.record_step(&step_id, &result);
            self.publish_cancelled(&result.message);
            return Ok(result);
        }
        if !result.success {
            self.failed = true;
            self.publish_failed(&result.message);
            return Ok(result);
        }

        // Hold the result at the review gate; the engine will not advance
        // until handle_review is called.
        if self.definition.requires_llm_review && step.review_gated() {
            self.awaiting_review = true;
            let review = result
                .clone()
                .with_review_data(self.review_context(&step_id, &result));
            self.pending_review = Some((step_id, result));
            self.publish_requires_input("llm_review");
            return Ok(review);
        }

        if result.continue_current_step {
            self.sessions.with_session_data(&self.session_id, |data| {
                data.merge(&result.data);
            })?;
            if result.requires_llm_processing {
                self.publish_llm_request(&step);
            }
            return Ok(result);
        }

        self.finish_step(&step_id, &result);

        if result.complete || self.current.is_none() {
            return Ok(result);
        }

        // Drive the next step when it can run without user input.
        let data = self.session_data();
        let next_can_run = self
            .current
            .as_deref()
            .and_then(|id| self.definition.step(id))
            .map(|next| {
                next.should_auto_advance()
                    || next.step_type() == StepType::LlmProcessing
                    || (next.step_type() == StepType::Interactive && next.should_skip(&data))
            })
            .unwrap_or(false);
        if next_can_run {
            return self.drive(None, depth + 1);
        }

        if self.requires_input() {
            // Landed on a genuine interactive step: announce it once.
            self.publish_requires_input("user");
            let _ = self.sessions.set_status(&self.session_id, SessionStatus::Waiting);
        }
        Ok(result)
    }

    /// Book-keeping after a successful, non-held step: merge result data,
    /// record history, resolve the next step, publish the step event.
    fn finish_step(&mut self, step_id: &str, result: &StepResult) {
        if let Err(e) = self.sessions.with_session_data(&self.session_id, |data| {
            data.merge(&result.data);
        }) {
            tracing::warn!(session_id = %self.session_id, error = %e, "session gone mid-step");
        }

        self.executed.push(step_id.to_string());
        self.sessions
            .record_step(&self.session_id, step_id, &result.message);

        let next = if result.complete {
            None
        } else {
            self.next_step_id(step_id, result)
        };
        self.current = next.clone();
        self.sessions
            .set_current_step(&self.session_id, next.as_deref());

        self.publish_step_completed(&result.message, self.current.is_none());
    }

    /// Next step resolution, in priority order: the result's jump target,
    /// its explicit next step, the first transition whose guard accepts,
    /// the sole unconditional transition, then none.
    fn next_step_id(&self, from: &str, result: &StepResult) -> Option<String> {
        if let Some(target) = &result.skip_to {
            return self.resolve_target(target);
        }
        if let Some(target) = &result.next_step {
            return self.resolve_target(target);
        }

        let data = self.session_data();
        let transitions = self.definition.transitions_from(from);
        for t in transitions {
            if let Some(guard) = &t.guard {
                if guard.accepts(result, &data) {
                    return t.to.as_step().map(str::to_string);
                }
            }
        }
        for t in transitions {
            if t.guard.is_none() {
                return t.to.as_step().map(str::to_string);
            }
        }
        None
    }

    fn resolve_target(&self, target: &str) -> Option<String> {
        match StepTarget::parse(target) {
            StepTarget::End => None,
            StepTarget::Step(id) => Some(id),
        }
    }

    fn review_context(&self, step_id: &str, result: &StepResult) -> Map<String, Value> {
        let mut ctx = result.llm_review_data.clone().unwrap_or_default();
        ctx.insert("workflow_type".to_string(), Value::from(self.definition.workflow_type.as_str()));
        ctx.insert("step_id".to_string(), Value::from(step_id));
        ctx.insert("message".to_string(), Value::from(result.message.as_str()));
        ctx.insert("data".to_string(), Value::Object(result.data.clone()));
        ctx.insert(
            "next_step".to_string(),
            match self.next_step_id(step_id, result) {
                Some(next) => Value::from(next),
                None => Value::Null,
            },
        );
        ctx
    }

    fn publish_step_completed(&self, message: &str, complete: bool) {
        if self.suppress_events && !complete {
            return;
        }
        let step_id = self.executed.last().cloned().unwrap_or_default();
        self.bus.publish(
            EventKind::WorkflowStepCompleted,
            event_data! {
                "session_id" => self.session_id.as_str(),
                "workflow_type" => self.definition.workflow_type.as_str(),
                "step_id" => step_id,
                "message" => message,
                "complete" => complete,
                "executed_steps" => self.executed.clone(),
            },
            "workflow_engine",
        );
    }

    fn publish_requires_input(&self, input_kind: &str) {
        if self.suppress_events {
            return;
        }
        let prompt = self.prompt().unwrap_or_default();
        let step_id = self.current.clone().unwrap_or_default();
        self.bus.publish(
            EventKind::WorkflowRequiresInput,
            event_data! {
                "session_id" => self.session_id.as_str(),
                "workflow_type" => self.definition.workflow_type.as_str(),
                "step_id" => step_id,
                "prompt" => prompt,
                "input_kind" => input_kind,
            },
            "workflow_engine",
        );
    }

    fn publish_failed(&self, error: &str) {
        // Terminal events publish even during discovery.
        let step_id = self.current.clone().unwrap_or_default();
        self.bus.publish(
            EventKind::WorkflowFailed,
            event_data! {
                "session_id" => self.session_id.as_str(),
                "workflow_type" => self.definition.workflow_type.as_str(),
                "step_id" => step_id,
                "error" => error,
            },
            "workflow_engine",
        );
    }

    fn publish_cancelled(&self, message: &str) {
        // Terminal events publish even during discovery.
        self.bus.publish(
            EventKind::WorkflowStepCompleted,
            event_data! {
                "session_id" => self.session_id.as_str(),
                "workflow_type" => self.definition.workflow_type.as_str(),
                "step_id" => self.current.clone().unwrap_or_default(),
                "message" => message,
                "complete" => true,
                "cancelled" => true,
                "executed_steps" => self.executed.clone(),
            },
            "workflow_engine",
        );
    }

    /// Publish the request an LLM-processing step builds; the serving side
    /// writes the output key into session data and re-drives the engine.
    fn publish_llm_request(&self, step: &Arc<dyn Step>) {
        if self.suppress_events {
            return;
        }
        let data = self.session_data();
        let Some(request) = step.llm_request(&data) else {
            return;
        };
        let request_value = match serde_json::to_value(&request) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(step = step.id(), error = %e, "llm request not serializable");
                return;
            }
        };
        self.bus.publish(
            EventKind::WorkflowRequiresInput,
            event_data! {
                "session_id" => self.session_id.as_str(),
                "workflow_type" => self.definition.workflow_type.as_str(),
                "step_id" => step.id(),
                "input_kind" => "llm_processing",
                "llm_request" => request_value,
            },
            "workflow_engine",
        );
    }

    /// Record a step trace without advancing (cancel path).
    fn record_step(&mut self, step_id: &str, result: &StepResult) {
        self.executed.push(step_id.to_string());
        self.sessions
            .record_step(&self.session_id, step_id, &result.message);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
