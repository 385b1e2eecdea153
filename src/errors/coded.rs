// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Coded domain errors with wrapping, classification, and chain walking.
//!
//! A [`CoreError`] carries a five-digit code from [`crate::errors::codes`],
//! an optional domain tag, a human-readable message, a details map, and an
//! optional cause. Two errors are the same kind iff their codes match;
//! everything else is presentation. Wrapping preserves the cause chain
//! through `std::error::Error::source`, so classification helpers can find
//! the nearest coded error inside an arbitrary chain.

use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use crate::errors::codes;

type BoxedError = Box<dyn Error + Send + Sync + 'static>;

/// A coded error. User-visible rendering is `[<code>] <message>[: <cause>]`.
#[derive(Debug)]
pub struct CoreError {
    code: String,
    domain: Option<String>,
    message: String,
    details: HashMap<String, Value>,
    cause: Option<BoxedError>,
}

impl CoreError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            domain: None,
            message: message.into(),
            details: HashMap::new(),
            cause: None,
        }
    }

    pub fn new_domain(
        domain: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(code, message);
        err.domain = Some(domain.into());
        err
    }

    /// Wraps `cause`, preserving it on the chain.
    pub fn wrap(
        cause: impl Into<BoxedError>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code, message).with_cause(cause)
    }

    pub fn wrap_domain(
        cause: impl Into<BoxedError>,
        domain: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new_domain(domain, code, message).with_cause(cause)
    }

    pub fn with_details(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_cause(mut self, cause: impl Into<BoxedError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &HashMap<String, Value> {
        &self.details
    }

    /// Two errors are the same kind iff their codes match.
    pub fn is(&self, other: &CoreError) -> bool {
        self.code == other.code
    }

    pub fn is_code(&self, code: &str) -> bool {
        self.code == code
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Finds the nearest [`CoreError`] in an error chain, starting at `err`.
pub fn find_code<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a CoreError> {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(coded) = e.downcast_ref::<CoreError>() {
            return Some(coded);
        }
        current = e.source();
    }
    None
}

fn classify(err: &(dyn Error + 'static), set: &[&str]) -> bool {
    find_code(err).is_some_and(|coded| set.contains(&coded.code()))
}

pub fn is_not_found(err: &(dyn Error + 'static)) -> bool {
    classify(err, codes::NOT_FOUND_CODES)
}

pub fn is_already_exists(err: &(dyn Error + 'static)) -> bool {
    classify(err, codes::ALREADY_EXISTS_CODES)
}

pub fn is_timeout(err: &(dyn Error + 'static)) -> bool {
    classify(err, codes::TIMEOUT_CODES)
}

pub fn is_rate_limited(err: &(dyn Error + 'static)) -> bool {
    classify(err, codes::RATE_LIMITED_CODES)
}

pub fn is_immutable(err: &(dyn Error + 'static)) -> bool {
    classify(err, codes::IMMUTABLE_CODES)
}
