// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end pipeline scenarios exercised through the registry, the way a
//! host transport would drive them.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CoreConfig;
use crate::context::RequestContext;
use crate::errors::{codes, CoreError};
use crate::pipeline::{
    register_pipeline_units, MemoryPipelineStore, PipelineExecutor, StepExecutor,
};
use crate::registry::Registry;

struct Harness {
    registry: Registry,
    ctx: RequestContext,
}

impl Harness {
    fn new(step_executor: Option<Arc<dyn StepExecutor>>) -> Self {
        let config = CoreConfig::default();
        let store = Arc::new(MemoryPipelineStore::new());
        let mut executor = PipelineExecutor::from_config(store.clone(), &config.executor);
        if let Some(step_executor) = step_executor {
            executor = executor.with_step_executor(step_executor);
        }

        let registry = Registry::new();
        register_pipeline_units(&registry, store, Arc::new(executor), &config).unwrap();

        Self {
            registry,
            ctx: RequestContext::new(),
        }
    }

    async fn command(&self, name: &str, input: Value) -> Result<Map<String, Value>, CoreError> {
        let command = self.registry.get_command(name).unwrap();
        let Value::Object(input) = input else {
            panic!("command input must be an object");
        };
        command.execute(&self.ctx, input).await
    }

    async fn query(&self, name: &str, input: Value) -> Result<Map<String, Value>, CoreError> {
        let query = self.registry.get_query(name).unwrap();
        let Value::Object(input) = input else {
            panic!("query input must be an object");
        };
        query.execute(&self.ctx, input).await
    }

    async fn wait_terminal(&self, run_id: &str) -> Map<String, Value> {
        for _ in 0..200 {
            let status = self
                .query("pipeline.status", json!({ "run_id": run_id }))
                .await
                .unwrap();
            match status["status"].as_str().unwrap() {
                "completed" | "failed" | "cancelled" => return status,
                _ => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
        panic!("run '{}' never reached a terminal state", run_id);
    }
}

#[tokio::test]
async fn test_create_run_and_observe_completion() {
    let harness = Harness::new(None);

    let created = harness
        .command(
            "pipeline.create",
            json!({
                "name": "two-step",
                "steps": [
                    { "id": "s1", "type": "test" },
                    { "id": "s2", "type": "test", "depends_on": ["s1"] }
                ]
            }),
        )
        .await
        .unwrap();
    let pipeline_id = created["pipeline_id"].as_str().unwrap().to_string();

    let started = harness
        .command("pipeline.run", json!({ "pipeline_id": pipeline_id }))
        .await
        .unwrap();
    assert_eq!(started["status"], json!("running"));
    let run_id = started["run_id"].as_str().unwrap().to_string();

    let finished = harness.wait_terminal(&run_id).await;
    assert_eq!(finished["status"], json!("completed"));
    assert_eq!(
        finished["step_results"]["s1"],
        json!({ "mock": true, "step": "s1" })
    );
    assert_eq!(
        finished["step_results"]["s2"],
        json!({ "mock": true, "step": "s2" })
    );

    // The pipeline settles back to idle and stays addressable.
    for _ in 0..200 {
        let pipeline = harness
            .query("pipeline.get", json!({ "pipeline_id": pipeline_id }))
            .await
            .unwrap();
        if pipeline["status"] == json!("idle") {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("pipeline never returned to idle");
}

#[tokio::test]
async fn test_out_of_order_dependencies_fail_at_execution() {
    let harness = Harness::new(None);

    // The DAG is acyclic, so creation succeeds; the declared order is the
    // execution order, so the run fails.
    let created = harness
        .command(
            "pipeline.create",
            json!({
                "name": "mis-ordered",
                "steps": [
                    { "id": "b", "type": "test", "depends_on": ["a"] },
                    { "id": "a", "type": "test" }
                ]
            }),
        )
        .await
        .unwrap();

    let started = harness
        .command(
            "pipeline.run",
            json!({ "pipeline_id": created["pipeline_id"] }),
        )
        .await
        .unwrap();

    let finished = harness
        .wait_terminal(started["run_id"].as_str().unwrap())
        .await;
    assert_eq!(finished["status"], json!("failed"));
    assert!(finished["error"]
        .as_str()
        .unwrap()
        .contains("dependency not satisfied: a"));
}

struct BlockingStepExecutor;

#[async_trait]
impl StepExecutor for BlockingStepExecutor {
    async fn execute_step(
        &self,
        _ctx: &RequestContext,
        _step_type: &str,
        _input: Map<String, Value>,
    ) -> Result<Value, CoreError> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

#[tokio::test]
async fn test_cancel_interrupts_a_running_step() {
    let harness = Harness::new(Some(Arc::new(BlockingStepExecutor)));

    let created = harness
        .command(
            "pipeline.create",
            json!({
                "name": "stuck",
                "steps": [{ "id": "s1", "type": "slow" }]
            }),
        )
        .await
        .unwrap();
    let pipeline_id = created["pipeline_id"].as_str().unwrap().to_string();

    let started = harness
        .command("pipeline.run", json!({ "pipeline_id": pipeline_id }))
        .await
        .unwrap();
    let run_id = started["run_id"].as_str().unwrap().to_string();

    let cancelled = harness
        .command("pipeline.cancel", json!({ "run_id": run_id }))
        .await
        .unwrap();
    assert_eq!(cancelled["success"], json!(true));

    let finished = harness.wait_terminal(&run_id).await;
    assert_eq!(finished["status"], json!("cancelled"));

    // Cancelling again is a no-op success.
    let again = harness
        .command("pipeline.cancel", json!({ "run_id": run_id }))
        .await
        .unwrap();
    assert_eq!(again["success"], json!(true));
    assert_eq!(again["status"], json!("cancelled"));
}

#[tokio::test]
async fn test_cyclic_definitions_are_rejected_everywhere() {
    let harness = Harness::new(None);
    let cyclic_steps = json!([
        { "id": "a", "type": "t", "depends_on": ["b"] },
        { "id": "b", "type": "t", "depends_on": ["a"] }
    ]);

    let verdict = harness
        .query("pipeline.validate", json!({ "steps": cyclic_steps.clone() }))
        .await
        .unwrap();
    assert_eq!(verdict["valid"], json!(false));
    assert!(verdict["issues"]
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i.as_str().unwrap().contains("circular dependency")));

    let err = harness
        .command(
            "pipeline.create",
            json!({ "name": "cyclic", "steps": cyclic_steps }),
        )
        .await
        .unwrap_err();
    assert!(err.is_code(codes::PIPELINE_INVALID));
}

#[tokio::test]
async fn test_pipelines_are_addressable_as_resources() {
    let harness = Harness::new(None);

    let created = harness
        .command(
            "pipeline.create",
            json!({
                "name": "addressable",
                "steps": [{ "id": "s1", "type": "test" }]
            }),
        )
        .await
        .unwrap();
    let pipeline_id = created["pipeline_id"].as_str().unwrap();

    // The listing is registered directly; per-pipeline URIs come from the
    // factory.
    let listing = harness
        .registry
        .get_resource_with_factory("asms://pipeline")
        .unwrap();
    let snapshot = listing.get(&harness.ctx).await.unwrap();
    assert_eq!(snapshot["total"], json!(1));

    let uri = format!("asms://pipeline/{}", pipeline_id);
    let resource = harness.registry.get_resource_with_factory(&uri).unwrap();
    let value = resource.get(&harness.ctx).await.unwrap();
    assert_eq!(value["name"], json!("addressable"));

    assert!(harness
        .registry
        .get_resource_with_factory("asms://pipeline/ghost")
        .is_none());
}
