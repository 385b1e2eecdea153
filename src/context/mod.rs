// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod ids;
mod request;

pub use ids::{new_request_id, new_trace_id};
pub use request::RequestContext;
