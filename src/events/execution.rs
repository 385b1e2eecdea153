// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution-lifecycle wrapper around unit invocations.
//!
//! An [`ExecutionContext`] is created when a host starts executing a unit
//! and binds the publisher, domain, unit name, correlation id, and start
//! time for that one invocation. The three publish methods emit
//! `execution_started`, `execution_completed`, and `execution_failed`
//! records; completion and failure include the elapsed duration in
//! milliseconds. Publish failures are swallowed and logged.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::events::{Event, EventPublisher};
use crate::observability::messages::events::EventPublishFailed;
use crate::observability::messages::StructuredLog;

pub const EXECUTION_STARTED: &str = "execution_started";
pub const EXECUTION_COMPLETED: &str = "execution_completed";
pub const EXECUTION_FAILED: &str = "execution_failed";

pub struct ExecutionContext {
    publisher: Option<Arc<dyn EventPublisher>>,
    domain: String,
    unit_name: String,
    correlation_id: String,
    start_time: Instant,
}

impl ExecutionContext {
    /// Binds an execution scope at unit entry. `None` is a legal publisher;
    /// all publishes become no-ops.
    pub fn new(
        publisher: Option<Arc<dyn EventPublisher>>,
        domain: impl Into<String>,
        unit_name: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            domain: domain.into(),
            unit_name: unit_name.into(),
            correlation_id: Uuid::new_v4().to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Announces that the unit started executing with `input`.
    pub fn started(&self, input: &Map<String, Value>) {
        let mut payload = self.base_payload();
        payload.insert("input".to_string(), Value::Object(input.clone()));
        self.emit(EXECUTION_STARTED, payload);
    }

    /// Announces successful completion with `output`.
    pub fn completed(&self, output: &Map<String, Value>) {
        let mut payload = self.base_payload();
        payload.insert("output".to_string(), Value::Object(output.clone()));
        payload.insert("duration_ms".to_string(), self.elapsed_ms().into());
        self.emit(EXECUTION_COMPLETED, payload);
    }

    /// Announces failure with the error's user-visible rendering.
    pub fn failed(&self, err: &CoreError) {
        let mut payload = self.base_payload();
        payload.insert("error".to_string(), Value::String(err.to_string()));
        payload.insert("error_code".to_string(), Value::String(err.code().to_string()));
        payload.insert("duration_ms".to_string(), self.elapsed_ms().into());
        self.emit(EXECUTION_FAILED, payload);
    }

    fn base_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("unit".to_string(), Value::String(self.unit_name.clone()));
        payload.insert("domain".to_string(), Value::String(self.domain.clone()));
        payload
    }

    fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn emit(&self, event_type: &str, payload: Map<String, Value>) {
        let Some(publisher) = &self.publisher else {
            return;
        };

        let event = Event::new(event_type, self.domain.clone(), payload)
            .with_correlation_id(self.correlation_id.clone());

        // Observability is best-effort: a failed publish never reaches the caller.
        if let Err(e) = publisher.publish(event) {
            EventPublishFailed {
                event_type,
                error: &e,
            }
            .log();
        }
    }
}
