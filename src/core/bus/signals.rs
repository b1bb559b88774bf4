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

//! Bus signal definitions
//!
//! The bus carries the transfer width in the opcode rather than in a
//! separate byte mask:
//!
//! ```text
//! Opcode | Meaning
//! -------|-------------------------------
//! WDU    | one word (read or write)
//! WD2..  | burst read of 2/4/8/16/32 words
//! HW0/1  | half-word write, lanes 0-1 / 2-3
//! BY0..3 | single byte write, lane 0..3
//! ```

use crate::core::types::{Address, ByteEnable, Word};
use std::fmt;

/// Bus transaction opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BusOpcode {
    /// Single word
    #[default]
    Wdu = 0x0,
    /// Half-word, bytes 0-1
    Hw0 = 0x2,
    /// Half-word, bytes 2-3
    Hw1 = 0x3,
    /// Byte 0
    By0 = 0x4,
    /// Byte 1
    By1 = 0x5,
    /// Byte 2
    By2 = 0x6,
    /// Byte 3
    By3 = 0x7,
    /// Burst of 2 words
    Wd2 = 0x9,
    /// Burst of 4 words
    Wd4 = 0xA,
    /// Burst of 8 words
    Wd8 = 0xB,
    /// Burst of 16 words
    Wd16 = 0xC,
    /// Burst of 32 words
    Wd32 = 0xD,
}

impl BusOpcode {
    /// Read opcode transferring a full cache line
    ///
    /// Line widths are validated at construction, so any other width maps
    /// to a single-word read.
    pub fn burst(words: usize) -> Self {
        match words {
            2 => Self::Wd2,
            4 => Self::Wd4,
            8 => Self::Wd8,
            16 => Self::Wd16,
            32 => Self::Wd32,
            _ => Self::Wdu,
        }
    }

    /// Write opcode encoding the width of a store
    ///
    /// # Example
    ///
    /// ```
    /// use xcache::core::bus::BusOpcode;
    /// use xcache::core::types::ByteEnable;
    ///
    /// assert_eq!(BusOpcode::from_byte_enable(ByteEnable::WORD), BusOpcode::Wdu);
    /// assert_eq!(BusOpcode::from_byte_enable(ByteEnable::HALF1), BusOpcode::Hw1);
    /// assert_eq!(BusOpcode::from_byte_enable(ByteEnable::BYTE2), BusOpcode::By2);
    /// ```
    pub fn from_byte_enable(be: ByteEnable) -> Self {
        match be.bits() {
            0x3 => Self::Hw0,
            0xC => Self::Hw1,
            0x1 => Self::By0,
            0x2 => Self::By1,
            0x4 => Self::By2,
            0x8 => Self::By3,
            _ => Self::Wdu,
        }
    }

    /// Number of words moved by a read with this opcode
    pub fn burst_words(self) -> usize {
        match self {
            Self::Wd2 => 2,
            Self::Wd4 => 4,
            Self::Wd8 => 8,
            Self::Wd16 => 16,
            Self::Wd32 => 32,
            _ => 1,
        }
    }

    /// Byte lanes written by a write with this opcode
    pub fn byte_enable(self) -> ByteEnable {
        match self {
            Self::Hw0 => ByteEnable::HALF0,
            Self::Hw1 => ByteEnable::HALF1,
            Self::By0 => ByteEnable::BYTE0,
            Self::By1 => ByteEnable::BYTE1,
            Self::By2 => ByteEnable::BYTE2,
            Self::By3 => ByteEnable::BYTE3,
            _ => ByteEnable::WORD,
        }
    }
}

impl fmt::Display for BusOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wdu => "WDU",
            Self::Hw0 => "HW0",
            Self::Hw1 => "HW1",
            Self::By0 => "BY0",
            Self::By1 => "BY1",
            Self::By2 => "BY2",
            Self::By3 => "BY3",
            Self::Wd2 => "WD2",
            Self::Wd4 => "WD4",
            Self::Wd8 => "WD8",
            Self::Wd16 => "WD16",
            Self::Wd32 => "WD32",
        };
        f.write_str(name)
    }
}

/// Target acknowledge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusAck {
    /// Not ready yet, hold the current phase
    #[default]
    Wait,
    /// Data phase completed
    Ready,
    /// Target error
    Error,
}

/// Bus lines sampled by the controller at the end of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusInputs {
    /// Bus granted to this controller
    pub gnt: bool,
    /// Target acknowledge for the current data phase
    pub ack: BusAck,
    /// Data lines (read data)
    pub data: Word,
    /// Bus timeout
    pub tout: bool,
    /// An address phase is in progress on the bus (any master)
    pub avalid: bool,
    /// Direction of that address phase
    pub read: bool,
    /// Address lines
    pub addr: Address,
}

/// Lines driven by the controller during a cycle
///
/// Derived from the committed state only (Moore outputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusOutputs {
    /// Bus request
    pub req: bool,
    /// Burst hold: keep the bus for the next address phase
    pub lock: bool,
    /// Direction of the driven address phase
    pub read: bool,
    /// Opcode of the driven address phase
    pub opc: BusOpcode,
    /// Address driven this cycle, if in an address phase
    pub addr: Option<Address>,
    /// Write data driven this cycle, if in a write data phase
    pub wdata: Option<Word>,
}
