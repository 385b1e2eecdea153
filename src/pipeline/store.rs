// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline and run persistence contract, with the in-memory implementation.
//!
//! The store owns deep copies: every write clones the argument in, every
//! read clones the stored value out. Mutating a caller-retained pipeline or
//! run after insertion never leaks into the store, and vice versa. All
//! operations are safe under concurrent access; a duplicate id on
//! `create_*` is the only race-visible failure.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::errors::{codes, CoreError};
use crate::pipeline::types::{Pipeline, PipelineStatus, Run, DOMAIN};

/// Filter for [`PipelineStore::list_pipelines`].
#[derive(Debug, Clone)]
pub struct ListFilter {
    pub status: Option<PipelineStatus>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Abstracts pipeline/run persistence for commands, queries, and the
/// executor.
pub trait PipelineStore: Send + Sync {
    /// Rejects duplicate ids with the domain's already-exists error.
    fn create_pipeline(&self, pipeline: &Pipeline) -> Result<(), CoreError>;

    fn get_pipeline(&self, id: &str) -> Result<Pipeline, CoreError>;

    /// Replaces the stored pipeline; absent ids are not-found errors.
    fn update_pipeline(&self, pipeline: &Pipeline) -> Result<(), CoreError>;

    fn delete_pipeline(&self, id: &str) -> Result<(), CoreError>;

    /// Returns the page and the total match count before offset/limit
    /// slicing.
    fn list_pipelines(&self, filter: &ListFilter) -> (Vec<Pipeline>, usize);

    fn create_run(&self, run: &Run) -> Result<(), CoreError>;

    fn get_run(&self, id: &str) -> Result<Run, CoreError>;

    fn update_run(&self, run: &Run) -> Result<(), CoreError>;

    /// Runs for one pipeline, or all runs when `pipeline_id` is `None`.
    fn list_runs(&self, pipeline_id: Option<&str>) -> Vec<Run>;
}

/// In-memory store backed by reader-writer-locked maps.
#[derive(Default)]
pub struct MemoryPipelineStore {
    pipelines: RwLock<HashMap<String, Pipeline>>,
    runs: RwLock<HashMap<String, Run>>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn pipeline_not_found(id: &str) -> CoreError {
    CoreError::new_domain(
        DOMAIN,
        codes::PIPELINE_NOT_FOUND,
        format!("pipeline '{}' not found", id),
    )
}

fn run_not_found(id: &str) -> CoreError {
    CoreError::new_domain(DOMAIN, codes::RUN_NOT_FOUND, format!("run '{}' not found", id))
}

impl PipelineStore for MemoryPipelineStore {
    fn create_pipeline(&self, pipeline: &Pipeline) -> Result<(), CoreError> {
        let mut pipelines = self
            .pipelines
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if pipelines.contains_key(&pipeline.id) {
            return Err(CoreError::new_domain(
                DOMAIN,
                codes::PIPELINE_ALREADY_EXISTS,
                format!("pipeline '{}' already exists", pipeline.id),
            ));
        }
        pipelines.insert(pipeline.id.clone(), pipeline.clone());
        Ok(())
    }

    fn get_pipeline(&self, id: &str) -> Result<Pipeline, CoreError> {
        self.pipelines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| pipeline_not_found(id))
    }

    fn update_pipeline(&self, pipeline: &Pipeline) -> Result<(), CoreError> {
        let mut pipelines = self
            .pipelines
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !pipelines.contains_key(&pipeline.id) {
            return Err(pipeline_not_found(&pipeline.id));
        }
        pipelines.insert(pipeline.id.clone(), pipeline.clone());
        Ok(())
    }

    fn delete_pipeline(&self, id: &str) -> Result<(), CoreError> {
        self.pipelines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| pipeline_not_found(id))
    }

    fn list_pipelines(&self, filter: &ListFilter) -> (Vec<Pipeline>, usize) {
        let pipelines = self
            .pipelines
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut matches: Vec<Pipeline> = pipelines
            .values()
            .filter(|p| filter.status.map_or(true, |status| p.status == status))
            .cloned()
            .collect();
        // Stable pagination: newest first, id as tiebreaker.
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matches.len();
        let page = matches
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect();
        (page, total)
    }

    fn create_run(&self, run: &Run) -> Result<(), CoreError> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if runs.contains_key(&run.id) {
            return Err(CoreError::new_domain(
                DOMAIN,
                codes::RUN_ALREADY_EXISTS,
                format!("run '{}' already exists", run.id),
            ));
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    fn get_run(&self, id: &str) -> Result<Run, CoreError> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| run_not_found(id))
    }

    fn update_run(&self, run: &Run) -> Result<(), CoreError> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if !runs.contains_key(&run.id) {
            return Err(run_not_found(&run.id));
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    fn list_runs(&self, pipeline_id: Option<&str>) -> Vec<Run> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|run| pipeline_id.map_or(true, |id| run.pipeline_id == id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serde_json::Map;

    fn pipeline(name: &str) -> Pipeline {
        Pipeline::new(name, vec![])
    }

    #[test]
    fn test_create_get_round_trip() {
        let store = MemoryPipelineStore::new();
        let p = pipeline("p1");
        store.create_pipeline(&p).unwrap();
        assert_eq!(store.get_pipeline(&p.id).unwrap(), p);
    }

    #[test]
    fn test_duplicate_create_is_already_exists() {
        let store = MemoryPipelineStore::new();
        let p = pipeline("p1");
        store.create_pipeline(&p).unwrap();
        let err = store.create_pipeline(&p).unwrap_err();
        assert!(err.is_code(codes::PIPELINE_ALREADY_EXISTS));

        let run = Run::new(&p.id, Map::new());
        store.create_run(&run).unwrap();
        let err = store.create_run(&run).unwrap_err();
        assert!(err.is_code(codes::RUN_ALREADY_EXISTS));
    }

    #[test]
    fn test_update_and_delete_absent_ids_are_not_found() {
        let store = MemoryPipelineStore::new();
        let p = pipeline("ghost");
        assert!(store.update_pipeline(&p).unwrap_err().is_code(codes::PIPELINE_NOT_FOUND));
        assert!(store.delete_pipeline("ghost").unwrap_err().is_code(codes::PIPELINE_NOT_FOUND));
        assert!(store.get_run("ghost").unwrap_err().is_code(codes::RUN_NOT_FOUND));

        let run = Run::new("p", Map::new());
        assert!(store.update_run(&run).unwrap_err().is_code(codes::RUN_NOT_FOUND));
    }

    #[test]
    fn test_deep_copy_isolation() {
        let store = MemoryPipelineStore::new();
        let mut p = pipeline("p1");
        store.create_pipeline(&p).unwrap();

        // Mutating the caller's copy after insertion must not leak in.
        p.name = "mutated".to_string();
        p.config.insert("k".to_string(), json!("v"));
        assert_eq!(store.get_pipeline(&p.id).unwrap().name, "p1");
        assert!(store.get_pipeline(&p.id).unwrap().config.is_empty());

        // Mutating a retrieved copy must not alter subsequent retrievals.
        let mut retrieved = store.get_pipeline(&p.id).unwrap();
        retrieved.name = "also mutated".to_string();
        assert_eq!(store.get_pipeline(&p.id).unwrap().name, "p1");
    }

    #[test]
    fn test_list_filters_by_status_and_reports_total_before_slicing() {
        let store = MemoryPipelineStore::new();
        for i in 0..5 {
            let mut p = pipeline(&format!("p{}", i));
            if i % 2 == 0 {
                p.status = PipelineStatus::Running;
            }
            store.create_pipeline(&p).unwrap();
        }

        let (page, total) = store.list_pipelines(&ListFilter::default());
        assert_eq!(page.len(), 5);
        assert_eq!(total, 5);

        let (page, total) = store.list_pipelines(&ListFilter {
            status: Some(PipelineStatus::Running),
            limit: 2,
            offset: 0,
        });
        assert_eq!(page.len(), 2);
        assert_eq!(total, 3);

        // Offset beyond the total yields an empty page with the true total.
        let (page, total) = store.list_pipelines(&ListFilter {
            status: None,
            limit: 100,
            offset: 10,
        });
        assert!(page.is_empty());
        assert_eq!(total, 5);
    }

    #[test]
    fn test_list_runs_by_pipeline() {
        let store = MemoryPipelineStore::new();
        store.create_run(&Run::new("p-1", Map::new())).unwrap();
        store.create_run(&Run::new("p-1", Map::new())).unwrap();
        store.create_run(&Run::new("p-2", Map::new())).unwrap();

        assert_eq!(store.list_runs(Some("p-1")).len(), 2);
        assert_eq!(store.list_runs(Some("p-2")).len(), 1);
        assert_eq!(store.list_runs(None).len(), 3);
        assert!(store.list_runs(Some("p-3")).is_empty());
    }
}
