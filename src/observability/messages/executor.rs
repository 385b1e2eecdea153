// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline run lifecycle events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// Run admitted and moved to running.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunStarted<'a> {
    pub run_id: &'a str,
    pub pipeline_id: &'a str,
    pub step_count: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}' started for pipeline '{}': {} steps",
            self.run_id, self.pipeline_id, self.step_count
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            pipeline_id = self.pipeline_id,
            step_count = self.step_count,
            "{}", self
        );
    }
}

/// Run completed with every step successful.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCompleted<'a> {
    pub run_id: &'a str,
    pub pipeline_id: &'a str,
    pub step_count: usize,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}' completed for pipeline '{}': {} steps",
            self.run_id, self.pipeline_id, self.step_count
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            pipeline_id = self.pipeline_id,
            step_count = self.step_count,
            "{}", self
        );
    }
}

/// Run failed on a step or dependency check.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunFailed<'a> {
    pub run_id: &'a str,
    pub pipeline_id: &'a str,
    pub reason: &'a str,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}' failed for pipeline '{}': {}",
            self.run_id, self.pipeline_id, self.reason
        )
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            run_id = self.run_id,
            pipeline_id = self.pipeline_id,
            reason = self.reason,
            "{}", self
        );
    }
}

/// Run observed cancellation and stopped.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCancelled<'a> {
    pub run_id: &'a str,
    pub pipeline_id: &'a str,
}

impl Display for RunCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}' cancelled for pipeline '{}'",
            self.run_id, self.pipeline_id
        )
    }
}

impl StructuredLog for RunCancelled<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            pipeline_id = self.pipeline_id,
            "{}", self
        );
    }
}

/// A pipeline status update could not be persisted.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct PipelineStatusPersistFailed<'a> {
    pub pipeline_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for PipelineStatusPersistFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Persisting pipeline '{}' failed: {}",
            self.pipeline_id, self.error
        )
    }
}

impl StructuredLog for PipelineStatusPersistFailed<'_> {
    fn log(&self) {
        tracing::error!(
            pipeline_id = self.pipeline_id,
            error = %self.error,
            "{}", self
        );
    }
}

/// A terminal status update could not be persisted.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunPersistFailed<'a> {
    pub run_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunPersistFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Persisting run '{}' failed: {}",
            self.run_id, self.error
        )
    }
}

impl StructuredLog for RunPersistFailed<'_> {
    fn log(&self) {
        tracing::error!(
            run_id = self.run_id,
            error = %self.error,
            "{}", self
        );
    }
}
