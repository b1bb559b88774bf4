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

//! Instruction/data cache controller
//!
//! Sits between a processor (one instruction port, one data port) and a
//! shared arbitrated bus. Four FSMs cooperate through a register file:
//!
//! - instruction cache controller (`icache`)
//! - data cache controller (`dcache`)
//! - snoop unit (`snoop`)
//! - bus transaction controller (`crate::core::bus`)
//!
//! # Cycle model
//!
//! Every call to [`XCache::tick`] is one clock edge. All FSMs read the
//! register values of the previous cycle and write the values of the next
//! one; the whole register file is committed at the end of the tick. The FSMs
//! are evaluated in a fixed order (icache, dcache, snoop, bus) and when two of
//! them write the same register in one cycle the later one wins.
//!
//! Cache arrays are not registers: tag and data updates take effect at once,
//! so the snoop unit observes the data cache as modified earlier in the same
//! cycle.
//!
//! The write buffer is updated after the FSMs ran: a store is posted if the
//! buffer had room at the start of the cycle, and the head entry is removed
//! in the cycle the bus controller is granted the bus for it.
//!
//! # Example
//!
//! ```
//! use xcache::core::bus::BusInputs;
//! use xcache::core::config::XcacheConfig;
//! use xcache::core::xcache::{DataRequest, InstructionRequest, XCache};
//!
//! let mut xcache = XCache::new(XcacheConfig::default()).unwrap();
//!
//! // A cacheable fetch misses and asks for the bus
//! xcache.tick(&InstructionRequest::fetch(0x100), &DataRequest::NONE, &BusInputs::default()).unwrap();
//! xcache.tick(&InstructionRequest::fetch(0x100), &DataRequest::NONE, &BusInputs::default()).unwrap();
//! assert!(xcache.bus_outputs().req);
//! ```

mod dcache;
mod icache;
mod request;
mod snoop;
mod stats;

#[cfg(test)]
mod tests;

pub use dcache::{DCacheState, Reservation};
pub use icache::ICacheState;
pub use request::{
    xtn, DataKind, DataRequest, DataResponse, InstructionRequest, InstructionResponse, SC_ATOMIC,
    SC_NOT_ATOMIC,
};
pub use stats::XcacheStats;

use crate::core::bus::{
    BusInputs, BusOpcode, BusOutputs, BusPort, BusSources, BusState, PendingRequests,
};
use crate::core::cache::SetAssociativeCache;
use crate::core::config::{CacheabilityTable, XcacheConfig};
use crate::core::error::Result;
use crate::core::types::Address;
use crate::core::write_buffer::{WriteBuffer, WriteEntry};
use dcache::DCacheRegs;
use icache::ICacheRegs;
use snoop::SnoopRegs;
use std::fmt;

/// Register file shared by the FSMs
#[derive(Debug, Clone)]
struct Registers {
    icache: ICacheRegs,
    dcache: DCacheRegs,
    snoop: SnoopRegs,
    bus: BusPort,
    pending: PendingRequests,
}

impl Registers {
    fn new(max_words: usize) -> Self {
        Self {
            icache: ICacheRegs::default(),
            dcache: DCacheRegs::default(),
            snoop: SnoopRegs::default(),
            bus: BusPort::new(max_words),
            pending: PendingRequests::default(),
        }
    }
}

/// Everything the controller answers in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleResult {
    pub instruction: InstructionResponse,
    pub data: DataResponse,
    /// A posted write failed on the bus this cycle
    pub write_bus_error: bool,
}

/// Architectural state summary for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSnapshot {
    pub cycle: u64,
    pub icache: ICacheState,
    pub dcache: DCacheState,
    pub bus: BusState,
    pub wbuf_len: usize,
    pub reservation: Option<Address>,
}

impl fmt::Display for TraceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle {:>6}  {:<20} {:<20} {:<16} wbuf={}",
            self.cycle, self.icache, self.dcache, self.bus, self.wbuf_len
        )?;
        if let Some(addr) = self.reservation {
            write!(f, " llsc=0x{:08X}", addr)?;
        }
        Ok(())
    }
}

/// Instruction/data cache controller
pub struct XCache {
    config: XcacheConfig,
    cacheable: CacheabilityTable,
    icache: SetAssociativeCache,
    dcache: SetAssociativeCache,
    wbuf: WriteBuffer,
    regs: Registers,
    stats: XcacheStats,
    iline_mask: u32,
    dline_mask: u32,
    /// Address of the last delivered instruction
    last_inst: Option<Address>,
}

impl XCache {
    /// Build a controller in its reset state
    ///
    /// # Errors
    ///
    /// Any invalid configuration parameter. Nothing is built in that case.
    pub fn new(config: XcacheConfig) -> Result<Self> {
        config.validate()?;

        let cacheable = config.segments.cached_table()?;
        let icache = SetAssociativeCache::new(config.icache, "icache")?;
        let dcache = SetAssociativeCache::new(config.dcache, "dcache")?;
        let wbuf = WriteBuffer::new(config.wbuf_depth)?;
        let max_words = config.icache.words.max(config.dcache.words);

        log::info!(
            "xcache: icache {}x{}x{} ({} bytes), dcache {}x{}x{} ({} bytes), wbuf {}, snoop {}",
            config.icache.ways,
            config.icache.sets,
            config.icache.words,
            config.icache.capacity_bytes(),
            config.dcache.ways,
            config.dcache.sets,
            config.dcache.words,
            config.dcache.capacity_bytes(),
            config.wbuf_depth,
            if config.snoop { "on" } else { "off" }
        );

        Ok(Self {
            iline_mask: config.icache.line_mask(),
            dline_mask: config.dcache.line_mask(),
            config,
            cacheable,
            icache,
            dcache,
            wbuf,
            regs: Registers::new(max_words),
            stats: XcacheStats::default(),
            last_inst: None,
        })
    }

    /// Return every FSM to idle, invalidate both caches, empty the write
    /// buffer and clear the reservation and the counters
    pub fn reset(&mut self) {
        let max_words = self.config.icache.words.max(self.config.dcache.words);
        self.icache.reset();
        self.dcache.reset();
        self.wbuf.clear();
        self.regs = Registers::new(max_words);
        self.stats = XcacheStats::default();
        self.last_inst = None;
        log::debug!("xcache: reset");
    }

    /// Advance one clock cycle
    ///
    /// # Arguments
    ///
    /// * `ireq` - Instruction request presented this cycle
    /// * `dreq` - Data request presented this cycle
    /// * `bus` - Bus lines sampled this cycle
    ///
    /// # Errors
    ///
    /// A fatal request error (unsupported byte enable, maintenance operation
    /// or extended read). The controller must be reset afterwards.
    pub fn tick(
        &mut self,
        ireq: &InstructionRequest,
        dreq: &DataRequest,
        bus: &BusInputs,
    ) -> Result<CycleResult> {
        let cur = self.regs.clone();
        let mut next = cur.clone();

        self.stats.total_cycles += 1;

        let instruction = self.icache_transition(&cur, &mut next, ireq);
        if instruction.valid && !instruction.error {
            if self.last_inst != Some(ireq.addr) {
                self.stats.total_inst += 1;
            }
            self.last_inst = Some(ireq.addr);
        }

        let data = self.dcache_transition(&cur, &mut next, dreq)?;

        let snoop_llsc_inval = self.snoop_transition(&cur, &mut next, bus);

        let sources = BusSources {
            wbuf_front: self.wbuf.front().copied(),
            sc_addr: cur.dcache.save_addr,
            sc_wdata: cur.dcache.save_wdata,
            dcache_addr: cur.dcache.save_addr,
            icache_addr: cur.icache.save_addr,
            iline_mask: self.iline_mask,
            icache_words: self.config.icache.words,
            dcache_words: self.config.dcache.words,
            sc_cancel: snoop_llsc_inval || cur.snoop.llsc_inval_req,
        };
        let write_bus_error =
            cur.bus
                .transition(&mut next.bus, &cur.pending, &mut next.pending, &sources, bus);
        if write_bus_error {
            self.stats.write_bus_errors += 1;
        }

        // The head entry leaves the buffer when its write is granted
        let get = cur.bus.fsm == BusState::WriteReq
            && !cur.bus.txn.sc
            && next.bus.fsm == BusState::WriteAddr;
        let put = (cur.dcache.fsm == DCacheState::WriteReq && self.wbuf.wok()).then(|| WriteEntry {
            addr: cur.dcache.save_addr,
            data: cur.dcache.save_wdata,
            opcode: BusOpcode::from_byte_enable(cur.dcache.save_be),
        });
        self.wbuf.cycle(put, get);

        self.regs = next;

        log::trace!("{}", self.trace());

        Ok(CycleResult {
            instruction,
            data,
            write_bus_error,
        })
    }

    /// Lines driven on the bus this cycle (from committed state only)
    pub fn bus_outputs(&self) -> BusOutputs {
        self.regs.bus.outputs()
    }

    /// Whether the controller drives an address or data phase this cycle
    pub fn owns_bus(&self) -> bool {
        self.regs.bus.owns_bus()
    }

    /// Nothing left to do: every FSM idle, no pending request, write buffer
    /// drained and no snoop work queued
    pub fn is_quiescent(&self) -> bool {
        self.regs.icache.fsm == ICacheState::Idle
            && self.regs.dcache.fsm == DCacheState::Idle
            && self.regs.bus.fsm == BusState::Idle
            && !self.regs.pending.any()
            && self.wbuf.is_empty()
            && !self.regs.snoop.dcache_inval_req
            && !self.regs.snoop.flush_req
            && !self.regs.snoop.llsc_inval_req
    }

    pub fn trace(&self) -> TraceSnapshot {
        TraceSnapshot {
            cycle: self.stats.total_cycles,
            icache: self.regs.icache.fsm,
            dcache: self.regs.dcache.fsm,
            bus: self.regs.bus.fsm,
            wbuf_len: self.wbuf.len(),
            reservation: self.reservation(),
        }
    }

    pub fn stats(&self) -> &XcacheStats {
        &self.stats
    }

    pub fn config(&self) -> &XcacheConfig {
        &self.config
    }

    pub fn icache(&self) -> &SetAssociativeCache {
        &self.icache
    }

    pub fn dcache(&self) -> &SetAssociativeCache {
        &self.dcache
    }

    pub fn write_buffer(&self) -> &WriteBuffer {
        &self.wbuf
    }

    pub fn icache_state(&self) -> ICacheState {
        self.regs.icache.fsm
    }

    pub fn dcache_state(&self) -> DCacheState {
        self.regs.dcache.fsm
    }

    pub fn bus_state(&self) -> BusState {
        self.regs.bus.fsm
    }

    /// Reserved address, if a reservation is armed
    pub fn reservation(&self) -> Option<Address> {
        let llsc = self.regs.dcache.llsc;
        llsc.pending.then_some(llsc.addr)
    }

    /// Whether the address belongs to a cacheable segment
    pub fn is_cacheable(&self, addr: Address) -> bool {
        self.cacheable.is_cacheable(addr)
    }
}
