// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Usage Pattern
//!
//! ```rust
//! use asms_core::observability::messages::executor::RunStarted;
//! use asms_core::observability::messages::StructuredLog;
//!
//! RunStarted {
//!     run_id: "run-1",
//!     pipeline_id: "p-1",
//!     step_count: 3,
//! }
//! .log();
//! ```

pub mod events;
pub mod executor;
pub mod registry;

use std::fmt::Display;

/// Messages that emit field-aware `tracing` records at their own level.
pub trait StructuredLog: Display {
    fn log(&self);
}
