// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for event publishing failures.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// An event publisher rejected an event. The event is dropped.
///
/// # Log Level
/// `warn!` - Degraded but recoverable
pub struct EventPublishFailed<'a> {
    pub event_type: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for EventPublishFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Publishing '{}' event failed: {}",
            self.event_type, self.error
        )
    }
}

impl StructuredLog for EventPublishFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            event_type = self.event_type,
            error = %self.error,
            "{}", self
        );
    }
}
