// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod codes;

mod coded;
mod http;

pub use coded::{find_code, is_already_exists, is_immutable, is_not_found, is_rate_limited, is_timeout, CoreError};
pub use http::error_to_http;
