// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request-scoped context carrier.
//!
//! A [`RequestContext`] travels with every unit execution and carries the
//! request id, trace id, user id, start time, and an open metadata bag.
//! Setters derive a new context rather than mutating in place; getters
//! return zero values for unset slots and never fail. The carrier is cheap
//! to clone and safe to hand to detached tasks.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::context::ids::{new_request_id, new_trace_id};

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    trace_id: String,
    user_id: String,
    start_time: DateTime<Utc>,
    metadata: HashMap<String, Value>,
}

impl RequestContext {
    /// A fresh context with generated request and trace ids.
    pub fn new() -> Self {
        Self {
            request_id: new_request_id(),
            trace_id: new_trace_id(),
            user_id: String::new(),
            start_time: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// An empty context with no identifiers. Getters yield zero values.
    pub fn empty() -> Self {
        Self {
            request_id: String::new(),
            trace_id: String::new(),
            user_id: String::new(),
            start_time: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Metadata lookup; absent keys yield `Value::Null`.
    pub fn metadata(&self, key: &str) -> Value {
        self.metadata.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Metadata lookup as a string; absent or non-string values yield `""`.
    pub fn metadata_str(&self, key: &str) -> &str {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
