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

//! Bus target: a sparse word memory with a fixed access latency
//!
//! An address phase seen in cycle n is answered in cycle n+1 at the
//! earliest; `latency` adds that many `WAIT` cycles in front of the answer.
//! While a target answers `WAIT` it does not latch a new address, so a
//! burst master simply keeps driving the same one.

use crate::core::bus::{BusAck, BusOpcode};
use crate::core::types::{Address, Word};
use crate::core::write_buffer::WriteEntry;
use std::collections::HashMap;
use std::ops::Range;

/// An address phase as seen on the bus lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPhase {
    pub addr: Address,
    pub read: bool,
    pub opc: BusOpcode,
}

/// Sparse memory target
#[derive(Debug, Clone, Default)]
pub struct Memory {
    /// Word-aligned contents (absent words read as zero)
    words: HashMap<Address, Word>,
    /// Extra wait cycles per data phase
    latency: u32,
    /// Ranges answered with an error acknowledge
    error_ranges: Vec<Range<Address>>,
    /// Ranges that never answer
    silent_ranges: Vec<Range<Address>>,
    /// Latched address phase awaiting its data phase
    phase: Option<AddressPhase>,
    wait: u32,
    /// Completed writes, in bus order
    write_log: Vec<WriteEntry>,
}

impl Memory {
    /// Create an empty memory
    ///
    /// # Arguments
    ///
    /// * `latency` - Wait cycles inserted before each data phase completes
    pub fn new(latency: u32) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    /// Answer every access in `range` with an error acknowledge
    pub fn with_error_range(mut self, range: Range<Address>) -> Self {
        self.error_ranges.push(range);
        self
    }

    /// Never answer accesses in `range`
    pub fn with_silent_range(mut self, range: Range<Address>) -> Self {
        self.silent_ranges.push(range);
        self
    }

    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Read the word holding `addr`
    pub fn read_word(&self, addr: Address) -> Word {
        self.words.get(&(addr & !0x3)).copied().unwrap_or(0)
    }

    /// Store a full word at `addr` (backdoor, no bus activity)
    pub fn write_word(&mut self, addr: Address, data: Word) {
        self.words.insert(addr & !0x3, data);
    }

    /// Writes completed on the bus so far, oldest first
    pub fn write_log(&self) -> &[WriteEntry] {
        &self.write_log
    }

    /// A data phase is outstanding
    pub fn is_busy(&self) -> bool {
        self.phase.is_some()
    }

    /// Drop the outstanding phase (bus timeout or aborted burst)
    pub fn abort(&mut self) {
        if let Some(phase) = self.phase.take() {
            log::debug!("memory: phase 0x{:08X} dropped", phase.addr);
        }
        self.wait = 0;
    }

    /// Run one bus cycle
    ///
    /// Completes the phase latched in an earlier cycle (using `wdata` for a
    /// write) and then latches `addr` as the next address phase.
    ///
    /// # Returns
    ///
    /// The acknowledge and read data for the completed phase.
    pub fn cycle(&mut self, addr: Option<AddressPhase>, wdata: Option<Word>) -> (BusAck, Word) {
        let mut response = (BusAck::Wait, 0);

        if let Some(phase) = self.phase {
            if Self::contains(&self.silent_ranges, phase.addr) {
                return response;
            }
            if self.wait > 0 {
                self.wait -= 1;
                return response;
            }

            self.phase = None;
            response = self.complete(phase, wdata);
        }

        if let Some(next) = addr {
            self.phase = Some(next);
            self.wait = self.latency;
        }

        response
    }

    fn complete(&mut self, phase: AddressPhase, wdata: Option<Word>) -> (BusAck, Word) {
        if Self::contains(&self.error_ranges, phase.addr) {
            log::debug!("memory: error response at 0x{:08X}", phase.addr);
            return (BusAck::Error, 0);
        }

        if phase.read {
            return (BusAck::Ready, self.read_word(phase.addr));
        }

        let Some(data) = wdata else {
            log::warn!("memory: write to 0x{:08X} without data", phase.addr);
            return (BusAck::Error, 0);
        };

        let mask = phase.opc.byte_enable().mask();
        let old = self.read_word(phase.addr);
        self.write_word(phase.addr, (old & !mask) | (data & mask));
        self.write_log.push(WriteEntry {
            addr: phase.addr,
            data,
            opcode: phase.opc,
        });
        (BusAck::Ready, 0)
    }

    fn contains(ranges: &[Range<Address>], addr: Address) -> bool {
        ranges.iter().any(|range| range.contains(&addr))
    }
}
