// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitoring pool: long-running per-task monitors with suspend/restore.
//!
//! Every monitor owns a stop token and honors a bounded-wait join. On
//! shutdown, active monitors are marked `Suspended` in storage; on the next
//! start a caller-supplied factory reconstructs them and the records flip
//! back to `Running`.

use crate::error::RuntimeError;
use aria_core::Clock;
use aria_store::{BackgroundStatus, Store};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Body of a monitor: loops until the token is cancelled, sleeping the
/// check interval between passes.
pub type MonitorFuture = BoxFuture<'static, ()>;
pub type MonitorFn = Arc<dyn Fn(CancellationToken, Duration) -> MonitorFuture + Send + Sync>;

/// Reconstructs a monitor body from a suspended record's type + metadata.
/// Returning `None` leaves the record suspended.
pub type MonitorFactory = dyn Fn(&str, &Value) -> Option<MonitorFn> + Send + Sync;

/// Workers the pool will run concurrently.
pub const MONITOR_POOL_SIZE: usize = 10;

/// Bounded join when stopping a single monitor.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded join per worker during shutdown preparation.
pub const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

struct MonitorHandle {
    workflow_type: String,
    token: CancellationToken,
    join: tokio::task::JoinHandle<()>,
    check_interval: Duration,
}

/// Counts returned by [`MonitorPool::prepare_shutdown`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    pub suspended: Vec<String>,
    pub failed_to_stop: Vec<String>,
}

/// Counts returned by [`MonitorPool::restore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub failed: Vec<String>,
}

/// Bounded pool of long-lived monitors keyed by task id.
pub struct MonitorPool {
    store: Store,
    clock: Arc<dyn Clock>,
    limit: usize,
    monitors: Mutex<HashMap<String, MonitorHandle>>,
}

impl MonitorPool {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            store,
            clock,
            limit: MONITOR_POOL_SIZE,
            monitors: Mutex::new(HashMap::new()),
        })
    }

    /// Submit a monitor. The record (created beforehand or here) flips to
    /// `Running`; the body starts immediately.
    pub fn submit(
        &self,
        task_id: &str,
        workflow_type: &str,
        metadata: &Value,
        check_interval: Duration,
        monitor_fn: MonitorFn,
    ) -> Result<(), RuntimeError> {
        let now = self.clock.epoch_ms();
        {
            let monitors = self.monitors.lock();
            if monitors.len() >= self.limit {
                return Err(RuntimeError::MonitorCapacity(monitors.len()));
            }
        }

        match self.store.background(task_id)? {
            Some(_) => {
                self.store
                    .set_background_status(task_id, BackgroundStatus::Running, now)?;
            }
            None => {
                self.store.insert_background(
                    task_id,
                    workflow_type,
                    &Value::Object(serde_json::Map::new()),
                    metadata,
                    now,
                )?;
                self.store
                    .set_background_status(task_id, BackgroundStatus::Running, now)?;
            }
        }

        let token = CancellationToken::new();
        let join = tokio::spawn(monitor_fn(token.clone(), check_interval));
        tracing::info!(task_id, workflow_type, ?check_interval, "monitor started");
        self.monitors.lock().insert(
            task_id.to_string(),
            MonitorHandle {
                workflow_type: workflow_type.to_string(),
                token,
                join,
                check_interval,
            },
        );
        Ok(())
    }

    /// Stop one monitor: cancel its token and join within `timeout`.
    /// The record flips to `Cancelled`. Returns false when the body did
    /// not exit in time (it is detached, not aborted).
    pub async fn stop(&self, task_id: &str, timeout: Duration) -> Result<bool, RuntimeError> {
        let handle = self.monitors.lock().remove(task_id);
        let Some(handle) = handle else {
            return Err(RuntimeError::EngineNotFound(task_id.to_string()));
        };
        handle.token.cancel();
        let stopped = tokio::time::timeout(timeout, handle.join).await.is_ok();
        if !stopped {
            tracing::warn!(task_id, "monitor did not stop within {:?}", timeout);
        }
        let now = self.clock.epoch_ms();
        if let Err(e) = self
            .store
            .set_background_status(task_id, BackgroundStatus::Cancelled, now)
        {
            tracing::warn!(task_id, error = %e, "monitor record not updated on stop");
        }
        Ok(stopped)
    }

    /// Stop every monitor with the default timeout.
    pub async fn stop_all(&self) {
        let ids: Vec<String> = self.monitors.lock().keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.stop(&id, STOP_TIMEOUT).await {
                tracing::warn!(task_id = %id, error = %e, "stop_all failed for monitor");
            }
        }
    }

    /// Ids of currently registered monitors.
    pub fn active(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.monitors.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_active(&self, task_id: &str) -> bool {
        self.monitors.lock().contains_key(task_id)
    }

    /// Suspend every active monitor for shutdown: mark the record
    /// `Suspended`, signal the stop token, join each worker briefly.
    pub async fn prepare_shutdown(&self) -> ShutdownReport {
        let drained: Vec<(String, MonitorHandle)> = self.monitors.lock().drain().collect();
        let mut report = ShutdownReport::default();
        let now = self.clock.epoch_ms();

        for (task_id, handle) in drained {
            if let Err(e) = self
                .store
                .set_background_status(&task_id, BackgroundStatus::Suspended, now)
            {
                tracing::warn!(task_id = %task_id, error = %e, "suspend not persisted");
            }
            handle.token.cancel();
            match tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, handle.join).await {
                Ok(_) => report.suspended.push(task_id),
                Err(_) => {
                    tracing::warn!(task_id = %task_id, "monitor did not stop for shutdown");
                    report.failed_to_stop.push(task_id);
                }
            }
        }
        report.suspended.sort();
        tracing::info!(
            suspended = report.suspended.len(),
            failed = report.failed_to_stop.len(),
            "monitor shutdown prepared"
        );
        report
    }

    /// Restore suspended monitors through a factory. Tasks the factory
    /// cannot reconstruct stay `Suspended` and are reported as failures.
    pub fn restore(&self, factory: &MonitorFactory) -> Result<RestoreReport, RuntimeError> {
        let suspended = self.store.backgrounds_with_status(BackgroundStatus::Suspended)?;
        let mut report = RestoreReport::default();

        for record in suspended {
            let Some(monitor_fn) = factory(&record.workflow_type, &record.metadata) else {
                tracing::warn!(
                    task_id = %record.task_id,
                    workflow_type = %record.workflow_type,
                    "factory cannot restore monitor; leaving suspended"
                );
                report.failed.push(record.task_id);
                continue;
            };
            let interval = record
                .metadata
                .get("check_interval_secs")
                .and_then(Value::as_u64)
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(60));
            match self.submit(
                &record.task_id,
                &record.workflow_type,
                &record.metadata,
                interval,
                monitor_fn,
            ) {
                Ok(()) => report.restored.push(record.task_id),
                Err(e) => {
                    tracing::warn!(task_id = %record.task_id, error = %e, "restore submit failed");
                    report.failed.push(record.task_id);
                }
            }
        }
        report.restored.sort();
        Ok(report)
    }
}

/// Build a monitor body that runs `check` every interval until stopped.
pub fn interval_monitor<F>(check: F) -> MonitorFn
where
    F: Fn() + Send + Sync + 'static,
{
    let check = Arc::new(check);
    Arc::new(move |token: CancellationToken, interval: Duration| {
        let check = Arc::clone(&check);
        Box::pin(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => check(),
                }
            }
        }) as MonitorFuture
    })
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
