// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipelines as addressable resources.
//!
//! `asms://pipeline` lists all pipelines; `asms://pipeline/<id>` is one
//! pipeline. Per-pipeline resources are minted on demand by
//! [`PipelineResourceFactory`], so new pipelines are addressable without
//! registry churn. Watch streams poll the store: single pipelines on the
//! status cadence, the listing on the slower list cadence.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::WatchOptions;
use crate::context::RequestContext;
use crate::errors::{codes, CoreError};
use crate::pipeline::store::{ListFilter, PipelineStore};
use crate::pipeline::types::DOMAIN;
use crate::schema::Schema;
use crate::traits::{poll_stream, Resource, ResourceFactory};

const URI_PREFIX: &str = "asms://pipeline";

fn pipeline_schema() -> Schema {
    Schema::object()
        .with_property("id", Schema::string(), true)
        .with_property("name", Schema::string(), true)
        .with_property("steps", Schema::any_array(), true)
        .with_property("status", Schema::string(), true)
}

fn encode<T: serde::Serialize>(value: &T, what: &str) -> Result<Value, CoreError> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::new(codes::INTERNAL, format!("failed to encode {}", what)).with_cause(e))
}

/// One pipeline at `asms://pipeline/<id>`.
pub struct PipelineResource {
    uri: String,
    pipeline_id: String,
    store: Arc<dyn PipelineStore>,
    watch: WatchOptions,
}

impl PipelineResource {
    pub fn new(pipeline_id: impl Into<String>, store: Arc<dyn PipelineStore>, watch: WatchOptions) -> Self {
        let pipeline_id = pipeline_id.into();
        Self {
            uri: format!("{}/{}", URI_PREFIX, pipeline_id),
            pipeline_id,
            store,
            watch,
        }
    }
}

#[async_trait]
impl Resource for PipelineResource {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn schema(&self) -> Schema {
        pipeline_schema()
    }

    async fn get(&self, _ctx: &RequestContext) -> Result<Value, CoreError> {
        let pipeline = self.store.get_pipeline(&self.pipeline_id)?;
        encode(&pipeline, "pipeline")
    }

    async fn watch(
        &self,
        _ctx: &RequestContext,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<Value>, CoreError> {
        let store = self.store.clone();
        let pipeline_id = self.pipeline_id.clone();
        Ok(poll_stream(
            cancel,
            Duration::from_secs(self.watch.status_interval_secs),
            self.watch.channel_capacity,
            move || {
                let store = store.clone();
                let pipeline_id = pipeline_id.clone();
                async move {
                    let pipeline = store.get_pipeline(&pipeline_id)?;
                    encode(&pipeline, "pipeline")
                }
            },
        ))
    }
}

/// The pipeline listing at `asms://pipeline`.
pub struct PipelineListResource {
    store: Arc<dyn PipelineStore>,
    watch: WatchOptions,
}

impl PipelineListResource {
    pub fn new(store: Arc<dyn PipelineStore>, watch: WatchOptions) -> Self {
        Self { store, watch }
    }
}

fn list_snapshot(store: &Arc<dyn PipelineStore>) -> Result<Value, CoreError> {
    let (page, total) = store.list_pipelines(&ListFilter::default());
    let pipelines = encode(&page, "pipelines")?;
    Ok(json!({ "pipelines": pipelines, "total": total }))
}

#[async_trait]
impl Resource for PipelineListResource {
    fn uri(&self) -> &str {
        URI_PREFIX
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .with_property("pipelines", Schema::any_array(), true)
            .with_property("total", Schema::number(), true)
    }

    async fn get(&self, _ctx: &RequestContext) -> Result<Value, CoreError> {
        list_snapshot(&self.store)
    }

    async fn watch(
        &self,
        _ctx: &RequestContext,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<Value>, CoreError> {
        let store = self.store.clone();
        Ok(poll_stream(
            cancel,
            Duration::from_secs(self.watch.list_interval_secs),
            self.watch.channel_capacity,
            move || {
                let store = store.clone();
                async move { list_snapshot(&store) }
            },
        ))
    }
}

/// Mints [`PipelineResource`]s for `asms://pipeline/<id>` URIs. Unknown
/// ids decline rather than fail, so other factories get a turn.
pub struct PipelineResourceFactory {
    store: Arc<dyn PipelineStore>,
    watch: WatchOptions,
}

impl PipelineResourceFactory {
    pub fn new(store: Arc<dyn PipelineStore>, watch: WatchOptions) -> Self {
        Self { store, watch }
    }

    fn pipeline_id<'a>(&self, uri: &'a str) -> Option<&'a str> {
        let id = uri.strip_prefix(URI_PREFIX)?.strip_prefix('/')?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(id)
    }
}

impl ResourceFactory for PipelineResourceFactory {
    fn pattern(&self) -> &str {
        "asms://pipeline/{id}"
    }

    fn can_create(&self, uri: &str) -> bool {
        self.pipeline_id(uri).is_some()
    }

    fn create(&self, uri: &str) -> Result<Option<Arc<dyn Resource>>, CoreError> {
        let Some(id) = self.pipeline_id(uri) else {
            return Ok(None);
        };
        match self.store.get_pipeline(id) {
            Ok(_) => Ok(Some(Arc::new(PipelineResource::new(
                id,
                self.store.clone(),
                self.watch.clone(),
            )))),
            Err(e) if e.is_code(codes::PIPELINE_NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
