// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // runtime options
pub mod context;       // request-scoped carriers
pub mod errors;        // coded error taxonomy
pub mod events;        // lifecycle events + execution wrapper
pub mod observability;
pub mod pipeline;      // pipeline domain: store, executor, units
pub mod registry;      // name/URI -> unit lookup
pub mod schema;        // declarative schemas + validation
pub mod traits;        // unit protocol
