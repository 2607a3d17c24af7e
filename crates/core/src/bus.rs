// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish/subscribe event bus with an ordered asynchronous delivery queue.
//!
//! One dedicated worker drains an unbounded FIFO; handlers for an event run
//! serially in subscription order. `publish` enqueues and returns
//! immediately; `publish_sync` is the escape hatch that dispatches on the
//! caller before returning. Handler errors are counted and never stop the
//! remaining handlers.

use crate::clock::Clock;
use crate::error::HandlerError;
use crate::event::{Event, EventKind};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Events kept in the in-memory history ring.
const MAX_HISTORY: usize = 100;

/// Bounded wait for the delivery worker on `stop`.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handler callback signature. Must be cheap or hand off to its own task;
/// the delivery worker is serial.
pub type Handler = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

struct Subscriber {
    name: String,
    handler: Handler,
}

/// Authoritative bus counters, snapshotted by [`EventBus::stats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusStats {
    pub total_published: u64,
    pub total_processed: u64,
    pub processing_errors: u64,
    pub by_kind: HashMap<EventKind, u64>,
    pub queue_depth: usize,
    pub subscriber_counts: HashMap<EventKind, usize>,
    pub history_size: usize,
    pub running: bool,
}

struct BusInner {
    clock: Arc<dyn Clock>,
    subscribers: RwLock<HashMap<EventKind, Vec<Subscriber>>>,
    tx: mpsc::UnboundedSender<Event>,
    history: Mutex<VecDeque<Event>>,
    total_published: AtomicU64,
    total_processed: AtomicU64,
    processing_errors: AtomicU64,
    by_kind: Mutex<HashMap<EventKind, u64>>,
    queued: AtomicU64,
    running: AtomicBool,
}

impl BusInner {
    /// Build the envelope, bump counters, append to history.
    fn record(&self, kind: EventKind, data: Map<String, Value>, source: impl Into<String>) -> Event {
        let event = Event::new(kind, data, source, &*self.clock);
        self.total_published.fetch_add(1, Ordering::SeqCst);
        *self.by_kind.lock().entry(kind).or_insert(0) += 1;
        let mut history = self.history.lock();
        if history.len() == MAX_HISTORY {
            history.pop_front();
        }
        history.push_back(event.clone());
        event
    }

    /// Invoke every current subscriber for the event, serially, in
    /// subscription order. Errors are counted and contained.
    fn dispatch(&self, event: &Event) {
        let handlers: Vec<(String, Handler)> = {
            let subs = self.subscribers.read();
            match subs.get(&event.kind) {
                Some(list) => list
                    .iter()
                    .map(|s| (s.name.clone(), Arc::clone(&s.handler)))
                    .collect(),
                None => return,
            }
        };

        for (name, handler) in handlers {
            match handler(event) {
                Ok(()) => {
                    self.total_processed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    self.processing_errors.fetch_add(1, Ordering::SeqCst);
                    tracing::error!(kind = %event.kind, handler = %name, error = %e, "handler failed");
                }
            }
        }
    }
}

/// Typed pub/sub bus. One per runtime; tests build their own.
pub struct EventBus {
    inner: Arc<BusInner>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
    stop: CancellationToken,
}

impl EventBus {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            inner: Arc::new(BusInner {
                clock,
                subscribers: RwLock::new(HashMap::new()),
                tx,
                history: Mutex::new(VecDeque::with_capacity(MAX_HISTORY)),
                total_published: AtomicU64::new(0),
                total_processed: AtomicU64::new(0),
                processing_errors: AtomicU64::new(0),
                by_kind: Mutex::new(HashMap::new()),
                queued: AtomicU64::new(0),
                running: AtomicBool::new(false),
            }),
            rx: Mutex::new(Some(rx)),
            worker: Mutex::new(None),
            stop: CancellationToken::new(),
        })
    }

    /// Register a handler for `kind`. Handlers fire in subscription order.
    pub fn subscribe(&self, kind: EventKind, handler: Handler, name: impl Into<String>) {
        let name = name.into();
        tracing::debug!(kind = %kind, handler = %name, "subscribed");
        self.inner
            .subscribers
            .write()
            .entry(kind)
            .or_default()
            .push(Subscriber { name, handler });
    }

    /// Remove a previously registered handler (matched by pointer identity).
    pub fn unsubscribe(&self, kind: EventKind, handler: &Handler) {
        let mut subs = self.inner.subscribers.write();
        if let Some(list) = subs.get_mut(&kind) {
            list.retain(|s| !Arc::ptr_eq(&s.handler, handler));
        }
    }

    /// Publish asynchronously: enqueue for the delivery worker and return.
    pub fn publish(
        &self,
        kind: EventKind,
        data: Map<String, Value>,
        source: impl Into<String>,
    ) -> Event {
        let event = self.inner.record(kind, data, source);
        self.inner.queued.fetch_add(1, Ordering::SeqCst);
        if self.inner.tx.send(event.clone()).is_err() {
            // Receiver only disappears once the worker has shut down for good.
            self.inner.queued.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(kind = %kind, "publish after bus shutdown; event dropped");
        }
        event
    }

    /// Publish synchronously: dispatch to current subscribers on the caller
    /// before returning. Escape hatch for shutdown paths and tests.
    pub fn publish_sync(
        &self,
        kind: EventKind,
        data: Map<String, Value>,
        source: impl Into<String>,
    ) -> Event {
        let event = self.inner.record(kind, data, source);
        self.inner.dispatch(&event);
        event
    }

    /// Spawn the delivery worker. Idempotent; publishing before `start`
    /// buffers into the queue.
    pub fn start(&self) {
        let mut slot = self.worker.lock();
        if slot.is_some() {
            tracing::debug!("event bus already running");
            return;
        }
        let Some(mut rx) = self.rx.lock().take() else {
            tracing::warn!("event bus cannot restart after stop");
            return;
        };

        self.inner.running.store(true, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let stop = self.stop.clone();
        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    // On stop, exit immediately: queued-but-undelivered
                    // events are dropped by contract.
                    _ = stop.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(event) => {
                            inner.queued.fetch_sub(1, Ordering::SeqCst);
                            inner.dispatch(&event);
                        }
                        None => break,
                    },
                }
            }
            inner.running.store(false, Ordering::SeqCst);
            tracing::debug!("event delivery worker stopped");
        }));
    }

    /// Signal the worker and wait for it (bounded). In-flight handlers run
    /// to completion; anything still queued is dropped.
    pub async fn stop(&self) {
        let handle = self.worker.lock().take();
        let Some(handle) = handle else { return };
        self.stop.cancel();
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, handle).await.is_err() {
            tracing::warn!("event delivery worker did not stop within {:?}", STOP_JOIN_TIMEOUT);
        }
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Wait until the delivery queue is empty and the last dispatch
    /// returned. Test support: bounded spin.
    pub async fn drain(&self) {
        for _ in 0..400 {
            if self.inner.queued.load(Ordering::SeqCst) == 0 {
                // One extra yield so the final dispatch finishes its handlers.
                tokio::time::sleep(Duration::from_millis(2)).await;
                if self.inner.queued.load(Ordering::SeqCst) == 0 {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tracing::warn!("event bus drain timed out with events still queued");
    }

    pub fn stats(&self) -> BusStats {
        let subscriber_counts = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect();
        BusStats {
            total_published: self.inner.total_published.load(Ordering::SeqCst),
            total_processed: self.inner.total_processed.load(Ordering::SeqCst),
            processing_errors: self.inner.processing_errors.load(Ordering::SeqCst),
            by_kind: self.inner.by_kind.lock().clone(),
            queue_depth: self.inner.queued.load(Ordering::SeqCst) as usize,
            subscriber_counts,
            history_size: self.inner.history.lock().len(),
            running: self.inner.running.load(Ordering::SeqCst),
        }
    }

    /// Most recent events in insertion order, optionally filtered by kind.
    pub fn recent_events(&self, count: usize, kind: Option<EventKind>) -> Vec<Event> {
        let history = self.inner.history.lock();
        let filtered: Vec<Event> = history
            .iter()
            .filter(|e| kind.is_none_or(|k| e.kind == k))
            .cloned()
            .collect();
        let skip = filtered.len().saturating_sub(count);
        filtered.into_iter().skip(skip).collect()
    }

    pub fn clear_history(&self) {
        self.inner.history.lock().clear();
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
