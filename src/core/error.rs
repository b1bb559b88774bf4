// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cache controller error types

use thiserror::Error;

/// Result type for cache controller operations
pub type Result<T> = std::result::Result<T, XcacheError>;

/// Main error type for the cache controller
///
/// Every variant is fatal: it describes a misconfigured system or a request
/// the controller has no safe answer for. Bus transport errors are not
/// represented here; they travel in the processor responses instead.
#[derive(Error, Debug)]
pub enum XcacheError {
    #[error("{cache}: the number of ways cannot be larger than 16 (got {ways})")]
    InvalidWays { cache: &'static str, ways: usize },

    #[error("{cache}: the number of sets must be a non-zero power of two (got {sets})")]
    InvalidSets { cache: &'static str, sets: usize },

    #[error("{cache}: the line width can be 1, 2, 4, 8, 16 or 32 words (got {words})")]
    InvalidLineWords { cache: &'static str, words: usize },

    #[error("Invalid write buffer depth: {0} (must be at least 1)")]
    InvalidWriteBufferDepth(usize),

    #[error("Invalid segment table MSB count: {0} (valid range: 1-16)")]
    InvalidSegmentBits(u32),

    #[error("Invalid value for the BE field in a write request: {0:#x}")]
    InvalidByteEnable(u8),

    #[error("Unsupported external write request: {0} (only DCACHE_INVAL and SYNC are supported)")]
    UnsupportedMaintenance(u32),

    #[error("XTN_READ requests are not supported (opcode {0})")]
    UnsupportedXtnRead(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request script error: {0}")]
    Script(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
