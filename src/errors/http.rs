// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixed mapping from coded errors to HTTP status codes.
//!
//! HTTP-facing hosts translate the nearest coded error in a chain through
//! this table. Successful results are 200 on the host side; an error with
//! no coded layer, or an unrecognized code, maps to 500.

use std::error::Error;

use crate::errors::codes;
use crate::errors::coded::find_code;

/// Maps `err` to an HTTP status via the nearest coded error in its chain.
pub fn error_to_http(err: &(dyn Error + 'static)) -> u16 {
    let Some(coded) = find_code(err) else {
        return 500;
    };

    let code = coded.code();
    if code == codes::INVALID_INPUT || code == codes::PIPELINE_INVALID {
        400
    } else if code == codes::UNAUTHORIZED {
        401
    } else if codes::TIMEOUT_CODES.contains(&code) {
        408
    } else if codes::NOT_FOUND_CODES.contains(&code) {
        404
    } else if codes::ALREADY_EXISTS_CODES.contains(&code) {
        409
    } else if codes::RATE_LIMITED_CODES.contains(&code) {
        429
    } else if codes::UNAVAILABLE_CODES.contains(&code) {
        503
    } else {
        500
    }
}
