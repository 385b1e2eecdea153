// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! State-changing pipeline operations: create, delete, run, cancel.
//!
//! Each command owns an `Arc` to the store (and to the executor where it
//! schedules or cancels work) so registered instances are self-contained.
//! `pipeline.run` admits the run and returns immediately; callers poll
//! `pipeline.status` for the outcome.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::errors::{codes, CoreError};
use crate::pipeline::executor::PipelineExecutor;
use crate::pipeline::store::PipelineStore;
use crate::pipeline::types::{Pipeline, PipelineStatus, RunStatus, Run, Step, DOMAIN};
use crate::pipeline::validation::validate_steps;
use crate::schema::Schema;
use crate::traits::{Command, Example};

fn invalid_input(message: impl Into<String>) -> CoreError {
    CoreError::new_domain(DOMAIN, codes::INVALID_INPUT, message)
}

fn required_str<'a>(input: &'a Map<String, Value>, key: &str) -> Result<&'a str, CoreError> {
    match input.get(key).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(invalid_input(format!("'{}' is required", key))),
    }
}

fn example_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `pipeline.create` — validates a step list and persists a new pipeline.
pub struct CreatePipelineCommand {
    store: Arc<dyn PipelineStore>,
}

impl CreatePipelineCommand {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for CreatePipelineCommand {
    fn name(&self) -> &str {
        "pipeline.create"
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn description(&self) -> &str {
        "Create a pipeline from a named, validated step list"
    }

    fn input_schema(&self) -> Schema {
        Schema::object()
            .with_property("name", Schema::string().with_length(Some(1), None), true)
            .with_property(
                "steps",
                Schema::any_array().with_description("Step definitions forming a DAG"),
                true,
            )
            .with_property("config", Schema::object(), false)
    }

    fn output_schema(&self) -> Schema {
        Schema::object().with_property("pipeline_id", Schema::string(), true)
    }

    fn examples(&self) -> Vec<Example> {
        vec![Example {
            input: example_object(json!({
                "name": "p1",
                "steps": [
                    { "id": "s1", "type": "test", "input": { "model": "m" } }
                ]
            })),
            output: example_object(json!({
                "pipeline_id": "5f64a1c2-7d3e-4b8a-9c21-0e5d6f7a8b90"
            })),
            description: "Create a single-step pipeline".to_string(),
        }]
    }

    async fn execute(
        &self,
        _ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let name = required_str(&input, "name")?;

        let steps: Vec<Step> = match input.get("steps") {
            Some(value @ Value::Array(_)) => serde_json::from_value(value.clone())
                .map_err(|e| invalid_input("malformed step list").with_cause(e))?,
            _ => return Err(invalid_input("'steps' is required")),
        };
        if steps.is_empty() {
            return Err(invalid_input("'steps' must contain at least one step"));
        }

        let validation = validate_steps(&steps);
        if !validation.valid {
            return Err(CoreError::new_domain(
                DOMAIN,
                codes::PIPELINE_INVALID,
                "pipeline definition is invalid",
            )
            .with_details("issues", json!(validation.issues)));
        }

        let mut pipeline = Pipeline::new(name, steps);
        if let Some(Value::Object(config)) = input.get("config") {
            pipeline.config = config.clone();
        }
        self.store.create_pipeline(&pipeline)?;

        let mut output = Map::new();
        output.insert("pipeline_id".to_string(), Value::String(pipeline.id));
        Ok(output)
    }
}

/// `pipeline.delete` — removes a pipeline unless it has running work.
pub struct DeletePipelineCommand {
    store: Arc<dyn PipelineStore>,
}

impl DeletePipelineCommand {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for DeletePipelineCommand {
    fn name(&self) -> &str {
        "pipeline.delete"
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn description(&self) -> &str {
        "Delete a pipeline that is not currently running"
    }

    fn input_schema(&self) -> Schema {
        Schema::object().with_property("pipeline_id", Schema::string(), true)
    }

    fn output_schema(&self) -> Schema {
        Schema::object().with_property("success", Schema::boolean(), true)
    }

    async fn execute(
        &self,
        _ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let pipeline_id = required_str(&input, "pipeline_id")?;

        let pipeline = self.store.get_pipeline(pipeline_id)?;
        if pipeline.status == PipelineStatus::Running {
            return Err(CoreError::new_domain(
                DOMAIN,
                codes::PIPELINE_RUNNING,
                format!("pipeline '{}' has running work", pipeline_id),
            ));
        }
        self.store.delete_pipeline(pipeline_id)?;

        let mut output = Map::new();
        output.insert("success".to_string(), Value::Bool(true));
        Ok(output)
    }
}

/// `pipeline.run` — admits a new run and returns without waiting for it.
pub struct RunPipelineCommand {
    store: Arc<dyn PipelineStore>,
    executor: Arc<PipelineExecutor>,
}

impl RunPipelineCommand {
    pub fn new(store: Arc<dyn PipelineStore>, executor: Arc<PipelineExecutor>) -> Self {
        Self { store, executor }
    }
}

#[async_trait]
impl Command for RunPipelineCommand {
    fn name(&self) -> &str {
        "pipeline.run"
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn description(&self) -> &str {
        "Start a pipeline run; poll pipeline.status for the outcome"
    }

    fn input_schema(&self) -> Schema {
        Schema::object()
            .with_property("pipeline_id", Schema::string(), true)
            .with_property(
                "input",
                Schema::object().with_description("Overlaid onto each step's declared input"),
                false,
            )
    }

    fn output_schema(&self) -> Schema {
        Schema::object()
            .with_property("run_id", Schema::string(), true)
            .with_property("status", Schema::string(), true)
    }

    fn examples(&self) -> Vec<Example> {
        vec![Example {
            input: example_object(json!({
                "pipeline_id": "5f64a1c2-7d3e-4b8a-9c21-0e5d6f7a8b90"
            })),
            output: example_object(json!({
                "run_id": "9a80d3e4-1b2c-4f5a-8e67-2c3d4e5f6a71",
                "status": "running"
            })),
            description: "Admit a run; poll pipeline.status for the outcome".to_string(),
        }]
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let pipeline_id = required_str(&input, "pipeline_id")?;
        let run_input = match input.get("input") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let mut pipeline = self.store.get_pipeline(pipeline_id)?;

        let run = Run::new(&pipeline.id, run_input.clone());
        self.store.create_run(&run)?;

        // Mark the pipeline running before the executor sees the run: a
        // fast run can finish and settle the pipeline back to idle
        // immediately, and a status write after admission would overwrite
        // that settlement and strand the pipeline in running.
        pipeline.status = PipelineStatus::Running;
        pipeline.updated_at = Utc::now();
        self.store.update_pipeline(&pipeline)?;

        if let Err(e) = self.executor.execute(ctx, &pipeline, &run, run_input).await {
            // Admission failed; leave a terminal record rather than a
            // forever-pending run, and settle the pipeline if nothing
            // else is active.
            let mut failed = run;
            failed.status = RunStatus::Failed;
            failed.error = Some(e.message().to_string());
            failed.completed_at = Some(Utc::now());
            let _ = self.store.update_run(&failed);

            let still_active = self
                .store
                .list_runs(Some(&pipeline.id))
                .iter()
                .any(|r| !r.status.is_terminal());
            if !still_active {
                if let Ok(mut current) = self.store.get_pipeline(&pipeline.id) {
                    if current.status == PipelineStatus::Running {
                        current.status = PipelineStatus::Idle;
                        current.updated_at = Utc::now();
                        let _ = self.store.update_pipeline(&current);
                    }
                }
            }
            return Err(e);
        }

        let mut output = Map::new();
        output.insert("run_id".to_string(), Value::String(run.id));
        output.insert(
            "status".to_string(),
            Value::String(RunStatus::Running.as_str().to_string()),
        );
        Ok(output)
    }
}

/// `pipeline.cancel` — requests cancellation of a run. Idempotent: a run
/// already in a terminal state reports success without changing anything.
pub struct CancelRunCommand {
    store: Arc<dyn PipelineStore>,
    executor: Arc<PipelineExecutor>,
}

impl CancelRunCommand {
    pub fn new(store: Arc<dyn PipelineStore>, executor: Arc<PipelineExecutor>) -> Self {
        Self { store, executor }
    }
}

#[async_trait]
impl Command for CancelRunCommand {
    fn name(&self) -> &str {
        "pipeline.cancel"
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn description(&self) -> &str {
        "Request cancellation of a pending or running pipeline run"
    }

    fn input_schema(&self) -> Schema {
        Schema::object().with_property("run_id", Schema::string(), true)
    }

    fn output_schema(&self) -> Schema {
        Schema::object()
            .with_property("success", Schema::boolean(), true)
            .with_property("status", Schema::string(), true)
    }

    async fn execute(
        &self,
        _ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let run_id = required_str(&input, "run_id")?;

        let mut run = self.store.get_run(run_id)?;

        if !run.status.is_terminal() && !self.executor.cancel(run_id) {
            // The executor never saw this run (admitted by a prior process,
            // or still pending). Finalize it directly.
            run.status = RunStatus::Cancelled;
            run.completed_at = Some(Utc::now());
            self.store.update_run(&run)?;

            if let Ok(mut pipeline) = self.store.get_pipeline(&run.pipeline_id) {
                let still_active = self
                    .store
                    .list_runs(Some(&run.pipeline_id))
                    .iter()
                    .any(|r| !r.status.is_terminal());
                if !still_active && pipeline.status == PipelineStatus::Running {
                    pipeline.status = PipelineStatus::Idle;
                    pipeline.updated_at = Utc::now();
                    self.store.update_pipeline(&pipeline)?;
                }
            }
        }

        let status = self.store.get_run(run_id)?.status;
        let mut output = Map::new();
        output.insert("success".to_string(), Value::Bool(true));
        output.insert(
            "status".to_string(),
            Value::String(status.as_str().to_string()),
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::store::MemoryPipelineStore;
    use std::time::Duration;

    fn setup() -> (Arc<MemoryPipelineStore>, Arc<PipelineExecutor>) {
        let store = Arc::new(MemoryPipelineStore::new());
        let executor = Arc::new(PipelineExecutor::new(store.clone()));
        (store, executor)
    }

    fn create_input(name: &str, steps: Value) -> Map<String, Value> {
        let mut input = Map::new();
        input.insert("name".to_string(), json!(name));
        input.insert("steps".to_string(), steps);
        input
    }

    fn single_key(key: &str, value: &str) -> Map<String, Value> {
        let mut input = Map::new();
        input.insert(key.to_string(), json!(value));
        input
    }

    async fn wait_terminal(store: &Arc<MemoryPipelineStore>, run_id: &str) -> Run {
        for _ in 0..200 {
            let run = store.get_run(run_id).unwrap();
            if run.status.is_terminal() {
                return run;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("run '{}' never reached a terminal state", run_id);
    }

    #[tokio::test]
    async fn test_create_persists_a_valid_pipeline() {
        let (store, _) = setup();
        let command = CreatePipelineCommand::new(store.clone());

        let input = create_input(
            "p1",
            json!([
                { "id": "a", "type": "test" },
                { "id": "b", "type": "test", "depends_on": ["a"] }
            ]),
        );
        let output = command.execute(&RequestContext::new(), input).await.unwrap();

        let pipeline_id = output["pipeline_id"].as_str().unwrap();
        let pipeline = store.get_pipeline(pipeline_id).unwrap();
        assert_eq!(pipeline.name, "p1");
        assert_eq!(pipeline.steps.len(), 2);
        assert_eq!(pipeline.status, PipelineStatus::Idle);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_name_and_steps() {
        let (store, _) = setup();
        let command = CreatePipelineCommand::new(store);

        let err = command
            .execute(&RequestContext::new(), Map::new())
            .await
            .unwrap_err();
        assert!(err.is_code(codes::INVALID_INPUT));

        let err = command
            .execute(&RequestContext::new(), create_input("p1", json!([])))
            .await
            .unwrap_err();
        assert!(err.is_code(codes::INVALID_INPUT));
    }

    #[tokio::test]
    async fn test_create_surfaces_validation_issues() {
        let (store, _) = setup();
        let command = CreatePipelineCommand::new(store);

        let input = create_input(
            "cyclic",
            json!([
                { "id": "a", "type": "test", "depends_on": ["b"] },
                { "id": "b", "type": "test", "depends_on": ["a"] }
            ]),
        );
        let err = command
            .execute(&RequestContext::new(), input)
            .await
            .unwrap_err();

        assert!(err.is_code(codes::PIPELINE_INVALID));
        let issues = err.details().get("issues").unwrap().as_array().unwrap();
        assert!(issues
            .iter()
            .any(|i| i.as_str().unwrap().contains("circular dependency")));
    }

    #[tokio::test]
    async fn test_delete_refuses_running_pipelines() {
        let (store, _) = setup();
        let command = DeletePipelineCommand::new(store.clone());

        let mut pipeline = Pipeline::new("busy", vec![]);
        pipeline.status = PipelineStatus::Running;
        store.create_pipeline(&pipeline).unwrap();

        let err = command
            .execute(&RequestContext::new(), single_key("pipeline_id", &pipeline.id))
            .await
            .unwrap_err();
        assert!(err.is_code(codes::PIPELINE_RUNNING));

        // Idle pipelines delete cleanly.
        let mut stored = store.get_pipeline(&pipeline.id).unwrap();
        stored.status = PipelineStatus::Idle;
        store.update_pipeline(&stored).unwrap();

        let output = command
            .execute(&RequestContext::new(), single_key("pipeline_id", &pipeline.id))
            .await
            .unwrap();
        assert_eq!(output["success"], json!(true));
        assert!(store.get_pipeline(&pipeline.id).is_err());
    }

    #[tokio::test]
    async fn test_delete_unknown_pipeline_is_not_found() {
        let (store, _) = setup();
        let command = DeletePipelineCommand::new(store);

        let err = command
            .execute(&RequestContext::new(), single_key("pipeline_id", "ghost"))
            .await
            .unwrap_err();
        assert!(err.is_code(codes::PIPELINE_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_run_admits_and_completes() {
        let (store, executor) = setup();
        let create = CreatePipelineCommand::new(store.clone());
        let run = RunPipelineCommand::new(store.clone(), executor);

        let created = create
            .execute(
                &RequestContext::new(),
                create_input("p1", json!([{ "id": "s1", "type": "test" }])),
            )
            .await
            .unwrap();
        let pipeline_id = created["pipeline_id"].as_str().unwrap();

        let output = run
            .execute(&RequestContext::new(), single_key("pipeline_id", pipeline_id))
            .await
            .unwrap();
        assert_eq!(output["status"], json!("running"));

        let run_id = output["run_id"].as_str().unwrap();
        let finished = wait_terminal(&store, run_id).await;
        assert_eq!(finished.status, RunStatus::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fast_runs_leave_the_pipeline_idle() {
        let (store, executor) = setup();
        let create = CreatePipelineCommand::new(store.clone());
        let run = RunPipelineCommand::new(store.clone(), executor);

        let created = create
            .execute(
                &RequestContext::new(),
                create_input("fast", json!([{ "id": "s1", "type": "test" }])),
            )
            .await
            .unwrap();
        let pipeline_id = created["pipeline_id"].as_str().unwrap().to_string();

        // Mock steps have no await points, so the run can finish before
        // the command returns; the pipeline must still end up idle.
        for attempt in 0..20 {
            let output = run
                .execute(&RequestContext::new(), single_key("pipeline_id", &pipeline_id))
                .await
                .unwrap();
            let run_id = output["run_id"].as_str().unwrap().to_string();
            wait_terminal(&store, &run_id).await;

            let mut settled = false;
            for _ in 0..200 {
                if store.get_pipeline(&pipeline_id).unwrap().status == PipelineStatus::Idle {
                    settled = true;
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            assert!(
                settled,
                "attempt {}: pipeline stuck running with zero active runs",
                attempt
            );
        }
    }

    #[tokio::test]
    async fn test_run_unknown_pipeline_is_not_found() {
        let (store, executor) = setup();
        let run = RunPipelineCommand::new(store, executor);

        let err = run
            .execute(&RequestContext::new(), single_key("pipeline_id", "ghost"))
            .await
            .unwrap_err();
        assert!(err.is_code(codes::PIPELINE_NOT_FOUND));
    }

    #[test]
    fn test_examples_validate_against_their_schemas() {
        let (store, executor) = setup();
        let create = CreatePipelineCommand::new(store.clone());
        let run = RunPipelineCommand::new(store, executor);

        for (examples, input_schema, output_schema) in [
            (create.examples(), create.input_schema(), create.output_schema()),
            (run.examples(), run.input_schema(), run.output_schema()),
        ] {
            assert!(!examples.is_empty());
            for example in examples {
                crate::schema::validate(&input_schema, &Value::Object(example.input)).unwrap();
                crate::schema::validate(&output_schema, &Value::Object(example.output)).unwrap();
                assert!(!example.description.is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_on_terminal_runs() {
        let (store, executor) = setup();
        let cancel = CancelRunCommand::new(store.clone(), executor);

        let mut run = Run::new("p-1", Map::new());
        run.status = RunStatus::Completed;
        run.completed_at = Some(Utc::now());
        store.create_run(&run).unwrap();

        let output = cancel
            .execute(&RequestContext::new(), single_key("run_id", &run.id))
            .await
            .unwrap();
        assert_eq!(output["success"], json!(true));
        assert_eq!(output["status"], json!("completed"));
        assert_eq!(store.get_run(&run.id).unwrap().status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_finalizes_runs_unknown_to_the_executor() {
        let (store, executor) = setup();
        let cancel = CancelRunCommand::new(store.clone(), executor);

        let mut pipeline = Pipeline::new("p1", vec![]);
        pipeline.status = PipelineStatus::Running;
        store.create_pipeline(&pipeline).unwrap();
        let run = Run::new(&pipeline.id, Map::new());
        store.create_run(&run).unwrap();

        let output = cancel
            .execute(&RequestContext::new(), single_key("run_id", &run.id))
            .await
            .unwrap();
        assert_eq!(output["status"], json!("cancelled"));

        let stored = store.get_run(&run.id).unwrap();
        assert_eq!(stored.status, RunStatus::Cancelled);
        assert!(stored.completed_at.is_some());
        assert_eq!(
            store.get_pipeline(&pipeline.id).unwrap().status,
            PipelineStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_cancel_unknown_run_is_not_found() {
        let (store, executor) = setup();
        let cancel = CancelRunCommand::new(store, executor);

        let err = cancel
            .execute(&RequestContext::new(), single_key("run_id", "ghost"))
            .await
            .unwrap_err();
        assert!(err.is_code(codes::RUN_NOT_FOUND));
    }
}
