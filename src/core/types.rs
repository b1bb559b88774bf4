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

//! Shared scalar types

use crate::core::error::{Result, XcacheError};
use bitflags::bitflags;

/// 32-bit byte address
pub type Address = u32;

/// 32-bit data word
pub type Word = u32;

bitflags! {
    /// Byte-enable mask of a store (bit i enables byte lane i)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ByteEnable: u8 {
        const BYTE0 = 0x1;
        const BYTE1 = 0x2;
        const BYTE2 = 0x4;
        const BYTE3 = 0x8;
        const HALF0 = 0x3;
        const HALF1 = 0xC;
        const WORD = 0xF;
    }
}

impl ByteEnable {
    /// Decode a raw byte-enable field
    ///
    /// Only full words, aligned half-words and single bytes can be encoded
    /// in a bus write opcode, so every other pattern is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use xcache::core::types::ByteEnable;
    ///
    /// assert_eq!(ByteEnable::from_be(0xC).unwrap(), ByteEnable::HALF1);
    /// assert!(ByteEnable::from_be(0x5).is_err());
    /// ```
    pub fn from_be(be: u8) -> Result<Self> {
        match be {
            0xF | 0x3 | 0xC | 0x1 | 0x2 | 0x4 | 0x8 => Ok(Self::from_bits_retain(be)),
            _ => Err(XcacheError::InvalidByteEnable(be)),
        }
    }

    /// Expand to a 32-bit bit mask (0xFF per enabled lane)
    #[inline(always)]
    pub fn mask(self) -> u32 {
        (0..4)
            .filter(|lane| self.bits() & (1 << lane) != 0)
            .fold(0, |mask, lane| mask | (0xFF << (8 * lane)))
    }
}
