// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request and trace identifier generation.
//!
//! Identifiers are `<prefix>_<hex>` with 32 hex characters of entropy from
//! the operating system RNG. If system randomness is unavailable the fill
//! falls back to a time-derived pattern, so generation never fails; the
//! fallback trades collision resistance for availability and is logged.

use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

const ID_BYTES: usize = 16;

const REQUEST_ID_PREFIX: &str = "req";
const TRACE_ID_PREFIX: &str = "trc";

/// Returns a fresh request identifier, e.g. `req_9f8a...` (36 chars total).
pub fn new_request_id() -> String {
    format!("{}_{}", REQUEST_ID_PREFIX, random_hex())
}

/// Returns a fresh trace identifier, e.g. `trc_4c1d...` (36 chars total).
pub fn new_trace_id() -> String {
    format!("{}_{}", TRACE_ID_PREFIX, random_hex())
}

fn random_hex() -> String {
    let mut buf = [0u8; ID_BYTES];
    if OsRng.try_fill_bytes(&mut buf).is_err() {
        tracing::warn!("system randomness unavailable, using time-derived identifier fill");
        time_derived_fill(&mut buf);
    }

    let mut hex = String::with_capacity(ID_BYTES * 2);
    for byte in buf {
        // Writing to a String cannot fail.
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

fn time_derived_fill(buf: &mut [u8]) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = ((nanos >> ((i % 16) * 8)) & 0xff) as u8 ^ (i as u8).wrapping_mul(0x9d);
    }
}
