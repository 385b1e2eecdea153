// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Read-only pipeline operations: get, list, run status, step validation.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::errors::{codes, CoreError};
use crate::pipeline::store::{ListFilter, PipelineStore};
use crate::pipeline::types::{PipelineStatus, Step, DOMAIN};
use crate::pipeline::validation::validate_steps;
use crate::schema::Schema;
use crate::traits::Query;

fn invalid_input(message: impl Into<String>) -> CoreError {
    CoreError::new_domain(DOMAIN, codes::INVALID_INPUT, message)
}

fn required_str<'a>(input: &'a Map<String, Value>, key: &str) -> Result<&'a str, CoreError> {
    match input.get(key).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(invalid_input(format!("'{}' is required", key))),
    }
}

fn to_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// `pipeline.get` — the full definition of one pipeline.
pub struct GetPipelineQuery {
    store: Arc<dyn PipelineStore>,
}

impl GetPipelineQuery {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Query for GetPipelineQuery {
    fn name(&self) -> &str {
        "pipeline.get"
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn description(&self) -> &str {
        "Retrieve a pipeline definition by id"
    }

    fn input_schema(&self) -> Schema {
        Schema::object().with_property("pipeline_id", Schema::string(), true)
    }

    fn output_schema(&self) -> Schema {
        Schema::object()
            .with_property("id", Schema::string(), true)
            .with_property("name", Schema::string(), true)
            .with_property("steps", Schema::any_array(), true)
            .with_property("status", Schema::string(), true)
    }

    async fn execute(
        &self,
        _ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let pipeline_id = required_str(&input, "pipeline_id")?;
        let pipeline = self.store.get_pipeline(pipeline_id)?;
        let encoded = serde_json::to_value(&pipeline)
            .map_err(|e| CoreError::new(codes::INTERNAL, "failed to encode pipeline").with_cause(e))?;
        Ok(to_object(encoded))
    }
}

/// `pipeline.list` — a status-filtered, paginated pipeline listing.
///
/// `total` counts all matches before pagination so callers can page
/// confidently.
pub struct ListPipelinesQuery {
    store: Arc<dyn PipelineStore>,
}

impl ListPipelinesQuery {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Query for ListPipelinesQuery {
    fn name(&self) -> &str {
        "pipeline.list"
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn description(&self) -> &str {
        "List pipelines, optionally filtered by status"
    }

    fn input_schema(&self) -> Schema {
        Schema::object()
            .with_property(
                "status",
                Schema::string().with_enum(vec![
                    json!("idle"),
                    json!("running"),
                    json!("paused"),
                    json!("error"),
                ]),
                false,
            )
            .with_property(
                "limit",
                Schema::number().with_bounds(Some(1.0), Some(100.0)).with_default(json!(100)),
                false,
            )
            .with_property(
                "offset",
                Schema::number().with_bounds(Some(0.0), None).with_default(json!(0)),
                false,
            )
    }

    fn output_schema(&self) -> Schema {
        Schema::object()
            .with_property("pipelines", Schema::any_array(), true)
            .with_property("total", Schema::number(), true)
    }

    async fn execute(
        &self,
        _ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let status = match input.get("status") {
            Some(value) => Some(
                serde_json::from_value::<PipelineStatus>(value.clone())
                    .map_err(|e| invalid_input("unrecognized status filter").with_cause(e))?,
            ),
            None => None,
        };

        let limit = match input.get("limit") {
            Some(value) => match value.as_u64() {
                Some(limit @ 1..=100) => limit as usize,
                _ => return Err(invalid_input("'limit' must be between 1 and 100")),
            },
            None => 100,
        };
        let offset = match input.get("offset") {
            Some(value) => match value.as_u64() {
                Some(offset) => offset as usize,
                None => return Err(invalid_input("'offset' must be a non-negative integer")),
            },
            None => 0,
        };

        let (page, total) = self.store.list_pipelines(&ListFilter {
            status,
            limit,
            offset,
        });
        let pipelines = serde_json::to_value(&page)
            .map_err(|e| CoreError::new(codes::INTERNAL, "failed to encode pipelines").with_cause(e))?;

        let mut output = Map::new();
        output.insert("pipelines".to_string(), pipelines);
        output.insert("total".to_string(), json!(total));
        Ok(output)
    }
}

/// `pipeline.status` — the current state of one run, including step
/// results and the error when the run failed.
pub struct RunStatusQuery {
    store: Arc<dyn PipelineStore>,
}

impl RunStatusQuery {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Query for RunStatusQuery {
    fn name(&self) -> &str {
        "pipeline.status"
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn description(&self) -> &str {
        "Retrieve the current state of a pipeline run"
    }

    fn input_schema(&self) -> Schema {
        Schema::object().with_property("run_id", Schema::string(), true)
    }

    fn output_schema(&self) -> Schema {
        Schema::object()
            .with_property("id", Schema::string(), true)
            .with_property("pipeline_id", Schema::string(), true)
            .with_property("status", Schema::string(), true)
            .with_property("step_results", Schema::object(), true)
            .with_property("error", Schema::string(), false)
    }

    async fn execute(
        &self,
        _ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let run_id = required_str(&input, "run_id")?;
        let run = self.store.get_run(run_id)?;
        let encoded = serde_json::to_value(&run)
            .map_err(|e| CoreError::new(codes::INTERNAL, "failed to encode run").with_cause(e))?;
        Ok(to_object(encoded))
    }
}

/// `pipeline.validate` — dry-run structural validation of a step list,
/// without persisting anything.
pub struct ValidateStepsQuery;

impl ValidateStepsQuery {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ValidateStepsQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Query for ValidateStepsQuery {
    fn name(&self) -> &str {
        "pipeline.validate"
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn description(&self) -> &str {
        "Validate a step list without creating a pipeline"
    }

    fn input_schema(&self) -> Schema {
        Schema::object().with_property("steps", Schema::any_array(), true)
    }

    fn output_schema(&self) -> Schema {
        Schema::object()
            .with_property("valid", Schema::boolean(), true)
            .with_property("issues", Schema::array(Schema::string()), true)
    }

    async fn execute(
        &self,
        _ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let steps: Vec<Step> = match input.get("steps") {
            Some(value @ Value::Array(_)) => serde_json::from_value(value.clone())
                .map_err(|e| invalid_input("malformed step list").with_cause(e))?,
            _ => return Err(invalid_input("'steps' is required")),
        };

        let validation = validate_steps(&steps);
        let mut output = Map::new();
        output.insert("valid".to_string(), Value::Bool(validation.valid));
        output.insert("issues".to_string(), json!(validation.issues));
        Ok(output)
    }
}
