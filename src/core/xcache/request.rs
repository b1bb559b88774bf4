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

//! Processor-side request and response types

use crate::core::types::{Address, ByteEnable, Word};
use serde::Serialize;

/// Response data of a successful store-conditional
pub const SC_ATOMIC: Word = 0;

/// Response data of a failed store-conditional
pub const SC_NOT_ATOMIC: Word = 1;

/// Maintenance operation codes carried by extended writes (`addr / 4`)
pub mod xtn {
    pub const PTPR: u32 = 0;
    pub const TLB_MODE: u32 = 1;
    pub const ICACHE_FLUSH: u32 = 2;
    pub const DCACHE_FLUSH: u32 = 3;
    pub const ITLB_INVAL: u32 = 4;
    pub const DTLB_INVAL: u32 = 5;
    pub const ICACHE_INVAL: u32 = 6;
    pub const DCACHE_INVAL: u32 = 7;
    pub const ICACHE_PREFETCH: u32 = 8;
    pub const DCACHE_PREFETCH: u32 = 9;
    pub const SYNC: u32 = 10;
}

/// Instruction fetch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstructionRequest {
    pub valid: bool,
    pub addr: Address,
}

impl InstructionRequest {
    /// No fetch this cycle
    pub const NONE: Self = Self { valid: false, addr: 0 };

    /// Fetch the instruction at `addr`
    pub fn fetch(addr: Address) -> Self {
        Self { valid: true, addr }
    }
}

/// Instruction fetch response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstructionResponse {
    pub valid: bool,
    pub error: bool,
    pub instruction: Word,
}

impl InstructionResponse {
    pub(crate) fn instruction(instruction: Word) -> Self {
        Self {
            valid: true,
            error: false,
            instruction,
        }
    }

    pub(crate) fn error() -> Self {
        Self {
            valid: true,
            error: true,
            instruction: 0,
        }
    }
}

/// Data request type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    #[default]
    Read,
    Write,
    LoadLinked,
    StoreConditional,
    /// Extended (maintenance) write; the operation is `addr / 4`
    XtnWrite,
    /// Extended read; not supported by this controller
    XtnRead,
}

/// Data access request
///
/// # Example
///
/// ```
/// use xcache::core::types::ByteEnable;
/// use xcache::core::xcache::{DataKind, DataRequest};
///
/// let store = DataRequest::write(0x1000, 0xAB, ByteEnable::BYTE1);
/// assert_eq!(store.kind, DataKind::Write);
///
/// let inval = DataRequest::dcache_inval(0x1000);
/// assert_eq!(inval.addr, 7 * 4);
/// assert_eq!(inval.wdata, 0x1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRequest {
    pub valid: bool,
    pub kind: DataKind,
    pub addr: Address,
    pub wdata: Word,
    /// Lanes written by a store; checked when the store is accepted
    pub be: ByteEnable,
}

impl Default for DataRequest {
    fn default() -> Self {
        Self::NONE
    }
}

impl DataRequest {
    /// No data access this cycle
    pub const NONE: Self = Self {
        valid: false,
        kind: DataKind::Read,
        addr: 0,
        wdata: 0,
        be: ByteEnable::WORD,
    };

    fn new(kind: DataKind, addr: Address, wdata: Word, be: ByteEnable) -> Self {
        Self {
            valid: true,
            kind,
            addr,
            wdata,
            be,
        }
    }

    pub fn read(addr: Address) -> Self {
        Self::new(DataKind::Read, addr, 0, ByteEnable::WORD)
    }

    pub fn write(addr: Address, wdata: Word, be: ByteEnable) -> Self {
        Self::new(DataKind::Write, addr, wdata, be)
    }

    pub fn load_linked(addr: Address) -> Self {
        Self::new(DataKind::LoadLinked, addr, 0, ByteEnable::WORD)
    }

    pub fn store_conditional(addr: Address, wdata: Word) -> Self {
        Self::new(DataKind::StoreConditional, addr, wdata, ByteEnable::WORD)
    }

    /// Extended write of maintenance operation `op` with operand `wdata`
    pub fn xtn_write(op: u32, wdata: Word) -> Self {
        Self::new(DataKind::XtnWrite, op << 2, wdata, ByteEnable::WORD)
    }

    pub fn xtn_read(op: u32) -> Self {
        Self::new(DataKind::XtnRead, op << 2, 0, ByteEnable::WORD)
    }

    /// Invalidate the data cache line holding `target`
    pub fn dcache_inval(target: Address) -> Self {
        Self::xtn_write(xtn::DCACHE_INVAL, target)
    }

    /// Memory barrier
    pub fn sync() -> Self {
        Self::xtn_write(xtn::SYNC, 0)
    }
}

/// Data access response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataResponse {
    pub valid: bool,
    pub error: bool,
    pub rdata: Word,
}

impl DataResponse {
    pub(crate) fn data(rdata: Word) -> Self {
        Self {
            valid: true,
            error: false,
            rdata,
        }
    }

    pub(crate) fn error() -> Self {
        Self {
            valid: true,
            error: true,
            rdata: 0,
        }
    }
}
