// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The pipeline domain: multi-step workflows executed as DAGs.
//!
//! A pipeline is a named, validated list of steps; a run is one execution
//! of it. The domain exposes commands (`pipeline.create`, `pipeline.delete`,
//! `pipeline.run`, `pipeline.cancel`), queries (`pipeline.get`,
//! `pipeline.list`, `pipeline.status`, `pipeline.validate`), and resources
//! (`asms://pipeline`, `asms://pipeline/<id>`). Wire them all up with
//! [`register_pipeline_units`].

pub mod commands;
pub mod executor;
pub mod queries;
pub mod resource;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod integration_tests;

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::errors::CoreError;
use crate::registry::Registry;

pub use commands::{CancelRunCommand, CreatePipelineCommand, DeletePipelineCommand, RunPipelineCommand};
pub use executor::{PipelineExecutor, StepExecutor};
pub use queries::{GetPipelineQuery, ListPipelinesQuery, RunStatusQuery, ValidateStepsQuery};
pub use resource::{PipelineListResource, PipelineResource, PipelineResourceFactory};
pub use store::{ListFilter, MemoryPipelineStore, PipelineStore};
pub use types::{Pipeline, PipelineStatus, Run, RunStatus, Step, DOMAIN};
pub use validation::{validate_steps, StepValidation};

/// Registers every pipeline unit against `registry`, sharing one store and
/// one executor.
pub fn register_pipeline_units(
    registry: &Registry,
    store: Arc<dyn PipelineStore>,
    executor: Arc<PipelineExecutor>,
    config: &CoreConfig,
) -> Result<(), CoreError> {
    registry.register_command(Arc::new(CreatePipelineCommand::new(store.clone())))?;
    registry.register_command(Arc::new(DeletePipelineCommand::new(store.clone())))?;
    registry.register_command(Arc::new(RunPipelineCommand::new(
        store.clone(),
        executor.clone(),
    )))?;
    registry.register_command(Arc::new(CancelRunCommand::new(store.clone(), executor)))?;

    registry.register_query(Arc::new(GetPipelineQuery::new(store.clone())))?;
    registry.register_query(Arc::new(ListPipelinesQuery::new(store.clone())))?;
    registry.register_query(Arc::new(RunStatusQuery::new(store.clone())))?;
    registry.register_query(Arc::new(ValidateStepsQuery::new()))?;

    registry.register_resource(Arc::new(PipelineListResource::new(
        store.clone(),
        config.watch.clone(),
    )))?;
    registry.register_resource_factory(Arc::new(PipelineResourceFactory::new(
        store,
        config.watch.clone(),
    )));

    Ok(())
}
