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

//! Request scripts
//!
//! A script preloads memory, lists the processor requests in program order
//! and schedules writes by another bus master:
//!
//! ```toml
//! latency = 1
//!
//! [[memory]]
//! addr = 0x100
//! data = 0xCAFE
//!
//! [[request]]
//! op = "fetch"
//! addr = 0x0
//!
//! [[request]]
//! op = "write"
//! addr = 0x101
//! data = 0xAB00
//! be = 0x2
//!
//! [[external_write]]
//! cycle = 40
//! addr = 0x100
//! data = 7
//! ```
//!
//! Fetches and data requests are fed to their own port, each in order.

use crate::core::error::{Result, XcacheError};
use crate::core::types::{Address, ByteEnable, Word};
use crate::core::xcache::{DataRequest, InstructionRequest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Operation of a scripted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptOp {
    Fetch,
    Read,
    Write,
    #[serde(alias = "ll")]
    LoadLinked,
    #[serde(alias = "sc")]
    StoreConditional,
    /// Invalidate the data cache line holding `addr`
    Inval,
    Sync,
}

/// One scripted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub op: ScriptOp,
    #[serde(default)]
    pub addr: Address,
    #[serde(default)]
    pub data: Word,
    #[serde(default = "full_word")]
    pub be: u8,
}

fn full_word() -> u8 {
    0xF
}

/// A scripted request, routed to its port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Instruction(InstructionRequest),
    Data(DataRequest),
}

impl ScriptRequest {
    /// Build the processor request
    ///
    /// The byte-enable field is passed through unchecked; the controller
    /// rejects unsupported patterns when the store is accepted.
    pub fn route(&self) -> Routed {
        match self.op {
            ScriptOp::Fetch => Routed::Instruction(InstructionRequest::fetch(self.addr)),
            ScriptOp::Read => Routed::Data(DataRequest::read(self.addr)),
            ScriptOp::Write => Routed::Data(DataRequest::write(
                self.addr,
                self.data,
                ByteEnable::from_bits_retain(self.be),
            )),
            ScriptOp::LoadLinked => Routed::Data(DataRequest::load_linked(self.addr)),
            ScriptOp::StoreConditional => {
                Routed::Data(DataRequest::store_conditional(self.addr, self.data))
            }
            ScriptOp::Inval => Routed::Data(DataRequest::dcache_inval(self.addr)),
            ScriptOp::Sync => Routed::Data(DataRequest::sync()),
        }
    }
}

/// Initial memory word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInit {
    pub addr: Address,
    pub data: Word,
}

/// Address range answered with an error acknowledge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRange {
    pub base: Address,
    pub size: u32,
}

/// Single-word write issued by another bus master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalWrite {
    /// Earliest cycle the write may start
    pub cycle: u64,
    pub addr: Address,
    pub data: Word,
}

/// Complete request script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Memory wait cycles per data phase
    #[serde(default)]
    pub latency: u32,
    #[serde(default)]
    pub memory: Vec<MemoryInit>,
    #[serde(default)]
    pub error: Vec<ErrorRange>,
    #[serde(default)]
    pub request: Vec<ScriptRequest>,
    #[serde(default)]
    pub external_write: Vec<ExternalWrite>,
}

impl Script {
    /// Parse a TOML script
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let script: Self = toml::from_str(text).map_err(|e| XcacheError::Script(e.to_string()))?;
        for range in &script.error {
            if range.base.checked_add(range.size).is_none() {
                return Err(XcacheError::Script(format!(
                    "error range 0x{:08X}+0x{:X} wraps around",
                    range.base, range.size
                )));
            }
        }
        Ok(script)
    }

    /// Load a TOML script file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
