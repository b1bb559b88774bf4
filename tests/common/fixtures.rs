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

//! Test fixtures for common test scenarios

use std::io::Write;
use tempfile::NamedTempFile;
use xcache::core::config::{CacheGeometry, XcacheConfig};
use xcache::core::system::{Memory, System};

/// Small caches so that conflicts are easy to provoke
#[allow(dead_code)]
pub fn small_config() -> XcacheConfig {
    XcacheConfig {
        icache: CacheGeometry::new(1, 16, 4),
        dcache: CacheGeometry::new(2, 4, 4),
        wbuf_depth: 2,
        ..Default::default()
    }
}

/// System around a memory whose word at `addr` holds `!addr` for the
/// first `words` words
#[allow(dead_code)]
pub fn create_patterned_system(config: XcacheConfig, latency: u32, words: u32) -> System {
    let mut memory = Memory::new(latency);
    for i in 0..words {
        memory.write_word(i * 4, !(i * 4));
    }
    System::new(config, memory).expect("valid configuration")
}

/// Write `text` to a temporary file that lives as long as the handle
#[allow(dead_code)]
pub fn temp_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(text.as_bytes())
        .expect("Failed to write temp file");
    file
}
