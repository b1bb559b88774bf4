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

//! Write buffer
//!
//! Bounded FIFO between the data cache controller (producer) and the bus
//! controller (consumer). Insertion order is the program order of store
//! commits and entries leave strictly in that order.
//!
//! The bus controller only peeks at the head entry while it waits for the
//! bus; the entry is removed once the bus is granted. A put is decided from
//! the state at the start of the cycle, so one entry may enter and one may
//! leave in the same cycle even when full.

use crate::core::bus::BusOpcode;
use crate::core::error::{Result, XcacheError};
use crate::core::types::{Address, Word};
use std::collections::VecDeque;

/// One posted store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteEntry {
    /// Byte address of the store
    pub addr: Address,
    /// Store data (lanes selected by `opcode`)
    pub data: Word,
    /// Bus write opcode encoding the store width
    pub opcode: BusOpcode,
}

/// Bounded store FIFO
#[derive(Debug, Clone)]
pub struct WriteBuffer {
    entries: VecDeque<WriteEntry>,
    depth: usize,
}

impl WriteBuffer {
    /// Create an empty write buffer
    ///
    /// # Errors
    ///
    /// Returns `InvalidWriteBufferDepth` for a zero depth.
    pub fn new(depth: usize) -> Result<Self> {
        if depth == 0 {
            return Err(XcacheError::InvalidWriteBufferDepth(depth));
        }
        Ok(Self {
            entries: VecDeque::with_capacity(depth),
            depth,
        })
    }

    /// At least one entry can be read
    #[inline(always)]
    pub fn rok(&self) -> bool {
        !self.entries.is_empty()
    }

    /// At least one entry can be written
    #[inline(always)]
    pub fn wok(&self) -> bool {
        self.entries.len() < self.depth
    }

    /// Oldest entry
    pub fn front(&self) -> Option<&WriteEntry> {
        self.entries.front()
    }

    /// Apply one cycle of FIFO activity
    ///
    /// `put` must have been decided from `wok()` at the start of the cycle.
    ///
    /// # Returns
    ///
    /// The entry removed by `get`, if any.
    ///
    /// # Example
    ///
    /// ```
    /// use xcache::core::bus::BusOpcode;
    /// use xcache::core::write_buffer::{WriteBuffer, WriteEntry};
    ///
    /// let mut wbuf = WriteBuffer::new(1).unwrap();
    /// let a = WriteEntry { addr: 0x10, data: 1, opcode: BusOpcode::Wdu };
    /// let b = WriteEntry { addr: 0x14, data: 2, opcode: BusOpcode::Wdu };
    ///
    /// wbuf.cycle(Some(a), false);
    /// assert!(!wbuf.wok());
    ///
    /// // Full, yet a put and a get can happen together
    /// assert_eq!(wbuf.cycle(Some(b), true), Some(a));
    /// assert_eq!(wbuf.front(), Some(&b));
    /// ```
    pub fn cycle(&mut self, put: Option<WriteEntry>, get: bool) -> Option<WriteEntry> {
        let taken = if get { self.entries.pop_front() } else { None };
        if let Some(entry) = put {
            debug_assert!(self.entries.len() < self.depth);
            self.entries.push_back(entry);
        }
        taken
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entry is buffered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capacity
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(addr: Address) -> WriteEntry {
        WriteEntry {
            addr,
            data: addr ^ 0xFFFF,
            opcode: BusOpcode::Wdu,
        }
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(WriteBuffer::new(0).is_err());
    }

    #[test]
    fn test_fifo_order() {
        let mut wbuf = WriteBuffer::new(4).unwrap();
        for addr in [0x10, 0x20, 0x30] {
            wbuf.cycle(Some(entry(addr)), false);
        }
        let drained: Vec<Address> = (0..3)
            .filter_map(|_| wbuf.cycle(None, true))
            .map(|e| e.addr)
            .collect();
        assert_eq!(drained, vec![0x10, 0x20, 0x30]);
        assert!(wbuf.is_empty());
    }

    #[test]
    fn test_full_and_empty_flags() {
        let mut wbuf = WriteBuffer::new(2).unwrap();
        assert!(!wbuf.rok());
        assert!(wbuf.wok());

        wbuf.cycle(Some(entry(0x0)), false);
        wbuf.cycle(Some(entry(0x4)), false);
        assert!(wbuf.rok());
        assert!(!wbuf.wok());
        assert_eq!(wbuf.len(), wbuf.depth());
    }

    #[test]
    fn test_get_on_empty_is_noop() {
        let mut wbuf = WriteBuffer::new(2).unwrap();
        assert_eq!(wbuf.cycle(None, true), None);
        assert!(wbuf.is_empty());
    }
}
