// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error code surface: five-digit zero-padded decimal strings.
//!
//! Codes are partitioned into reserved blocks, one per domain. The blocks
//! are a host contract; a domain must never reuse another block:
//!
//! | Block       | Domain         |
//! |-------------|----------------|
//! | 00000-00099 | generic        |
//! | 00100-00199 | model          |
//! | 00200-00299 | engine         |
//! | 00300-00399 | inference      |
//! | 00400-00499 | resource       |
//! | 00500-00599 | device         |
//! | 00600-00699 | service        |
//! | 00700-00799 | application    |
//! | 00800-00899 | pipeline       |
//! | 00900-00999 | alert          |
//! | 01000-01099 | remote         |
//! | 01100-01199 | catalog/recipe |
//! | 01200-01299 | skill          |
//! | 01300-01399 | agent          |
//!
//! Classification (not-found, already-exists, timeout, rate-limited,
//! immutable) is defined by membership in the named sets at the bottom of
//! this file, so a domain refinement like `PIPELINE_NOT_FOUND` classifies
//! the same way as the generic `NOT_FOUND`.

// Generic block (00000-00099).
pub const UNKNOWN: &str = "00000";
pub const INVALID_INPUT: &str = "00001";
pub const NOT_FOUND: &str = "00002";
pub const ALREADY_EXISTS: &str = "00003";
pub const UNAUTHORIZED: &str = "00004";
pub const TIMEOUT: &str = "00005";
pub const RATE_LIMITED: &str = "00006";
pub const IMMUTABLE: &str = "00007";
pub const INTERNAL: &str = "00008";

// Registry refinements, still in the generic block: one distinct code per
// collection so hosts can tell which registration collided.
pub const COMMAND_ALREADY_REGISTERED: &str = "00010";
pub const QUERY_ALREADY_REGISTERED: &str = "00011";
pub const RESOURCE_ALREADY_REGISTERED: &str = "00012";

// Model block (00100-00199).
pub const MODEL_NOT_FOUND: &str = "00100";

// Engine block (00200-00299).
pub const ENGINE_NOT_FOUND: &str = "00200";
pub const ENGINE_ALREADY_RUNNING: &str = "00201";

// Pipeline block (00800-00899).
pub const PIPELINE_NOT_FOUND: &str = "00800";
pub const PIPELINE_ALREADY_EXISTS: &str = "00801";
pub const PIPELINE_RUNNING: &str = "00802";
pub const PIPELINE_INVALID: &str = "00803";
pub const RUN_NOT_FOUND: &str = "00810";
pub const RUN_ALREADY_EXISTS: &str = "00811";
pub const RUN_NOT_CANCELLABLE: &str = "00812";

// Remote block (01000-01099).
pub const REMOTE_NOT_ENABLED: &str = "01000";

// Agent block (01300-01399).
pub const AGENT_NOT_ENABLED: &str = "01300";
pub const LLM_ERROR: &str = "01301";

/// Codes classified as "not found".
pub const NOT_FOUND_CODES: &[&str] = &[
    NOT_FOUND,
    MODEL_NOT_FOUND,
    ENGINE_NOT_FOUND,
    PIPELINE_NOT_FOUND,
    RUN_NOT_FOUND,
];

/// Codes classified as "already exists".
pub const ALREADY_EXISTS_CODES: &[&str] = &[
    ALREADY_EXISTS,
    COMMAND_ALREADY_REGISTERED,
    QUERY_ALREADY_REGISTERED,
    RESOURCE_ALREADY_REGISTERED,
    ENGINE_ALREADY_RUNNING,
    PIPELINE_ALREADY_EXISTS,
    RUN_ALREADY_EXISTS,
];

/// Codes classified as "timeout".
pub const TIMEOUT_CODES: &[&str] = &[TIMEOUT];

/// Codes classified as "rate limited".
pub const RATE_LIMITED_CODES: &[&str] = &[RATE_LIMITED];

/// Codes classified as "immutable": the target exists but refuses mutation.
pub const IMMUTABLE_CODES: &[&str] = &[IMMUTABLE, PIPELINE_RUNNING, RUN_NOT_CANCELLABLE];

/// Codes for features a host has not enabled; they map to HTTP 503.
pub const UNAVAILABLE_CODES: &[&str] = &[REMOTE_NOT_ENABLED, AGENT_NOT_ENABLED, LLM_ERROR];
