// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for dynamic resource resolution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A resource factory failed while creating a resource for a URI.
///
/// Factory errors are skipped during resolution, so this log line is the
/// only trace the failure leaves.
///
/// # Log Level
/// `warn!` - Degraded but recoverable
pub struct FactoryCreateFailed<'a> {
    pub pattern: &'a str,
    pub uri: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for FactoryCreateFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resource factory '{}' failed to create '{}': {}",
            self.pattern, self.uri, self.error
        )
    }
}

impl StructuredLog for FactoryCreateFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            pattern = self.pattern,
            uri = self.uri,
            error = %self.error,
            "{}", self
        );
    }
}
