// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lifecycle events and publishers.
//!
//! Domains announce state changes as [`Event`]s with dotted type strings
//! (`pipeline.run_started`, `remote.enabled`). Every event carries a
//! timestamp and a correlation id so hosts can stitch together what
//! happened after the fact. Publishing is best-effort observability:
//! callers must never fail an operation because an event could not be
//! delivered.

mod execution;

pub use execution::{
    ExecutionContext, EXECUTION_COMPLETED, EXECUTION_FAILED, EXECUTION_STARTED,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Mutex;
use uuid::Uuid;

use crate::errors::CoreError;

/// A lifecycle event with a dotted `<domain>.<verb>` type string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub domain: String,
    pub payload: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
}

impl Event {
    /// An event with an explicit type string.
    pub fn new(
        event_type: impl Into<String>,
        domain: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            domain: domain.into(),
            payload,
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    /// A domain event with the dotted `<domain>.<verb>` convention.
    pub fn domain_event(domain: &str, verb: &str, payload: Map<String, Value>) -> Self {
        Self::new(format!("{}.{}", domain, verb), domain, payload)
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

/// Sink for lifecycle events. Implementations must be safe to call from
/// concurrent unit executions.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event) -> Result<(), CoreError>;
}

/// Publisher that discards every event.
#[derive(Debug, Default)]
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: Event) -> Result<(), CoreError> {
        Ok(())
    }
}

/// In-process publisher that retains events for inspection. Useful for
/// hosts that drain events on their own cadence, and for tests.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<Event>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events published so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Removes and returns all retained events.
    pub fn drain(&self) -> Vec<Event> {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *events)
    }
}

impl EventPublisher for MemoryPublisher {
    fn publish(&self, event: Event) -> Result<(), CoreError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
        Ok(())
    }
}
