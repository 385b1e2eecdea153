// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Centralized message types for diagnostic and operational logging. Each
//! message is a struct with a `Display` implementation so log text lives in
//! one place instead of being scattered as magic strings; lifecycle
//! messages additionally implement [`messages::StructuredLog`] to emit
//! field-aware `tracing` records.
//!
//! Messages are organized by subsystem:
//! * `messages::executor` - pipeline run lifecycle
//! * `messages::registry` - dynamic resource resolution
//! * `messages::events` - event publishing failures

pub mod messages;
