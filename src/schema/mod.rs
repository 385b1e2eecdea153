// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod types;
mod validation;

pub use types::{Field, Schema, SchemaType};
pub use validation::{validate, SchemaViolation};
