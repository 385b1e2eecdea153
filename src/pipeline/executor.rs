//! Pipeline run executor: step iteration, cancellation, and bookkeeping.
//!
//! [`PipelineExecutor::execute`] admits a run: it moves the run to
//! `running`, persists it, and returns. The step loop proceeds in a
//! detached task so status updates reach the store even after the caller
//! goes away. Steps execute strictly in declared order with no intra-run
//! concurrency; across runs there is no ordering at all.
//!
//! Every in-flight run has a cancellation token in a mutex-guarded table.
//! The mutex is held only for insert/lookup/remove, never across step
//! execution. [`PipelineExecutor::cancel`] fires the token and reports
//! whether the run was known; removal from the table is guaranteed on
//! every exit path. Tearing the executor down cancels all in-flight runs
//! and waits for them.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ExecutorOptions;
use crate::context::RequestContext;
use crate::errors::CoreError;
use crate::events::{Event, EventPublisher};
use crate::observability::messages::events::EventPublishFailed;
use crate::observability::messages::executor::{
    PipelineStatusPersistFailed, RunCancelled, RunCompleted, RunFailed, RunPersistFailed,
    RunStarted,
};
use crate::observability::messages::StructuredLog;
use crate::pipeline::store::PipelineStore;
use crate::pipeline::types::{Pipeline, PipelineStatus, Run, RunStatus, DOMAIN};

/// Host-provided callback that turns `(step_type, input)` into an output.
/// The executor core is generic over it; without one, steps produce mock
/// outputs.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute_step(
        &self,
        ctx: &RequestContext,
        step_type: &str,
        input: Map<String, Value>,
    ) -> Result<Value, CoreError>;
}

struct InFlightRun {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

pub struct PipelineExecutor {
    store: Arc<dyn PipelineStore>,
    step_executor: Option<Arc<dyn StepExecutor>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    /// Bounds concurrently stepping runs; admitted runs queue for a permit.
    limiter: Option<Arc<Semaphore>>,
    in_flight: Mutex<HashMap<String, InFlightRun>>,
    shutdown: CancellationToken,
}

impl PipelineExecutor {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self {
            store,
            step_executor: None,
            publisher: None,
            limiter: None,
            in_flight: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// An executor wired from loaded [`ExecutorOptions`].
    pub fn from_config(store: Arc<dyn PipelineStore>, options: &ExecutorOptions) -> Self {
        let executor = Self::new(store);
        match options.max_concurrent_runs {
            Some(limit) => executor.with_max_concurrent_runs(limit),
            None => executor,
        }
    }

    pub fn with_max_concurrent_runs(mut self, limit: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(limit)));
        self
    }

    pub fn with_step_executor(mut self, step_executor: Arc<dyn StepExecutor>) -> Self {
        self.step_executor = Some(step_executor);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Admits `run`: moves it to `running`, persists, and schedules the
    /// step loop in the background. Returns an error only when that
    /// initial persistence fails; step errors land on the run itself.
    pub async fn execute(
        self: &Arc<Self>,
        ctx: &RequestContext,
        pipeline: &Pipeline,
        run: &Run,
        input: Map<String, Value>,
    ) -> Result<(), CoreError> {
        let mut run = run.clone();
        run.status = RunStatus::Running;
        self.store.update_run(&run)?;

        RunStarted {
            run_id: &run.id,
            pipeline_id: &pipeline.id,
            step_count: pipeline.steps.len(),
        }
        .log();
        self.publish_run_event("run_started", &run, None);

        // The run's cancellation scope is a child of the executor's, so
        // tearing the executor down cancels every in-flight run.
        let cancel = self.shutdown.child_token();
        let run_id = run.id.clone();
        self.lock_in_flight().insert(
            run_id.clone(),
            InFlightRun {
                cancel: cancel.clone(),
                handle: None,
            },
        );

        let this = Arc::clone(self);
        let task_ctx = ctx.clone();
        let pipeline = pipeline.clone();
        let task_run_id = run_id.clone();
        let limiter = self.limiter.clone();
        let handle = tokio::spawn(async move {
            // Queue for a concurrency permit; cancellation still lands
            // while waiting.
            let _permit = match &limiter {
                Some(limiter) => tokio::select! {
                    _ = cancel.cancelled() => None,
                    permit = Arc::clone(limiter).acquire_owned() => permit.ok(),
                },
                None => None,
            };
            this.run_steps(task_ctx, pipeline, run, input, cancel).await;
            this.lock_in_flight().remove(&task_run_id);
        });

        // The task may already have finished and removed its entry.
        if let Some(entry) = self.lock_in_flight().get_mut(&run_id) {
            entry.handle = Some(handle);
        }
        Ok(())
    }

    /// Signals cancellation. Returns `true` only while the run is in the
    /// in-flight table; terminal runs are immutable to cancellation.
    /// Idempotent.
    pub fn cancel(&self, run_id: &str) -> bool {
        match self.lock_in_flight().get(run_id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, run_id: &str) -> bool {
        self.lock_in_flight().contains_key(run_id)
    }

    /// Cancels all in-flight runs and waits for their tasks to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<JoinHandle<()>> = self
            .lock_in_flight()
            .values_mut()
            .filter_map(|entry| entry.handle.take())
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<String, InFlightRun>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_steps(
        &self,
        ctx: RequestContext,
        pipeline: Pipeline,
        mut run: Run,
        input: Map<String, Value>,
        cancel: CancellationToken,
    ) {
        for step in &pipeline.steps {
            if cancel.is_cancelled() {
                self.finish(&pipeline, &mut run, RunStatus::Cancelled, None);
                return;
            }

            // Steps run in declared order; a dependency that has not
            // executed yet means the caller emitted an invalid
            // linearization.
            for dependency in &step.depends_on {
                if !run.step_results.contains_key(dependency) {
                    self.finish(
                        &pipeline,
                        &mut run,
                        RunStatus::Failed,
                        Some(format!("dependency not satisfied: {}", dependency)),
                    );
                    return;
                }
            }

            // Effective input: the step's declared map with run-level
            // input overlaid; run keys win.
            let mut effective = step.input.clone();
            for (key, value) in &input {
                effective.insert(key.clone(), value.clone());
            }

            let output = match &self.step_executor {
                Some(executor) => {
                    let result = tokio::select! {
                        _ = cancel.cancelled() => {
                            self.finish(&pipeline, &mut run, RunStatus::Cancelled, None);
                            return;
                        }
                        result = executor.execute_step(&ctx, &step.step_type, effective) => result,
                    };
                    match result {
                        Ok(output) => output,
                        Err(e) => {
                            self.finish(
                                &pipeline,
                                &mut run,
                                RunStatus::Failed,
                                Some(format!("step {} failed: {}", step.id, e.message())),
                            );
                            return;
                        }
                    }
                }
                None => json!({ "mock": true, "step": step.id }),
            };

            run.step_results.insert(step.id.clone(), output);
        }

        self.finish(&pipeline, &mut run, RunStatus::Completed, None);
    }

    /// Moves a run to a terminal state, persists it, publishes the
    /// lifecycle event, and settles the owning pipeline's status.
    fn finish(&self, pipeline: &Pipeline, run: &mut Run, status: RunStatus, error: Option<String>) {
        run.status = status;
        run.error = error;
        run.completed_at = Some(Utc::now());

        if let Err(e) = self.store.update_run(run) {
            RunPersistFailed {
                run_id: &run.id,
                error: &e,
            }
            .log();
        }

        match status {
            RunStatus::Completed => {
                RunCompleted {
                    run_id: &run.id,
                    pipeline_id: &pipeline.id,
                    step_count: pipeline.steps.len(),
                }
                .log();
                self.publish_run_event("run_completed", run, None);
            }
            RunStatus::Failed => {
                let reason = run.error.as_deref().unwrap_or("unknown");
                RunFailed {
                    run_id: &run.id,
                    pipeline_id: &pipeline.id,
                    reason,
                }
                .log();
                self.publish_run_event("run_failed", run, run.error.as_deref());
            }
            RunStatus::Cancelled => {
                RunCancelled {
                    run_id: &run.id,
                    pipeline_id: &pipeline.id,
                }
                .log();
                self.publish_run_event("run_cancelled", run, None);
            }
            RunStatus::Pending | RunStatus::Running => {}
        }

        self.settle_pipeline_status(&run.pipeline_id);
    }

    /// Returns the pipeline to `idle` when its last run leaves `running`.
    fn settle_pipeline_status(&self, pipeline_id: &str) {
        let still_active = self
            .store
            .list_runs(Some(pipeline_id))
            .iter()
            .any(|run| !run.status.is_terminal());
        if still_active {
            return;
        }

        let Ok(mut pipeline) = self.store.get_pipeline(pipeline_id) else {
            return;
        };
        if pipeline.status != PipelineStatus::Running {
            return;
        }
        pipeline.status = PipelineStatus::Idle;
        pipeline.updated_at = Utc::now();
        if let Err(e) = self.store.update_pipeline(&pipeline) {
            PipelineStatusPersistFailed {
                pipeline_id,
                error: &e,
            }
            .log();
        }
    }

    fn publish_run_event(&self, verb: &str, run: &Run, error: Option<&str>) {
        let Some(publisher) = &self.publisher else {
            return;
        };

        let mut payload = Map::new();
        payload.insert("run_id".to_string(), Value::String(run.id.clone()));
        payload.insert(
            "pipeline_id".to_string(),
            Value::String(run.pipeline_id.clone()),
        );
        payload.insert(
            "status".to_string(),
            Value::String(run.status.as_str().to_string()),
        );
        if let Some(error) = error {
            payload.insert("error".to_string(), Value::String(error.to_string()));
        }

        let event = Event::domain_event(DOMAIN, verb, payload);
        let event_type = event.event_type.clone();
        if let Err(e) = publisher.publish(event) {
            EventPublishFailed {
                event_type: &event_type,
                error: &e,
            }
            .log();
        }
    }
}
