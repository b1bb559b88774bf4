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

//! System integration module
//!
//! Ties the cache controller to a memory target, a second bus master that
//! issues scripted writes, and a scripted processor, and clocks them all
//! together.
//!
//! # Arbitration
//!
//! The other master has priority: once one of its writes is due it takes
//! the bus as soon as the controller is not in an address or data phase.
//! Otherwise a controller request is granted in the cycle it is raised.
//!
//! # Timeout
//!
//! A data phase left unanswered for `timeout` cycles is aborted and the
//! bus timeout line is raised for one cycle.

mod memory;
mod script;

#[cfg(test)]
mod tests;

pub use memory::{AddressPhase, Memory};
pub use script::{ErrorRange, ExternalWrite, MemoryInit, Routed, Script, ScriptOp, ScriptRequest};

use crate::core::bus::{BusAck, BusInputs, BusOpcode};
use crate::core::config::XcacheConfig;
use crate::core::error::Result;
use crate::core::types::{Address, Word};
use crate::core::xcache::{
    DataKind, DataRequest, InstructionRequest, XCache, XcacheStats,
};
use serde::Serialize;
use std::collections::VecDeque;

/// Default bus timeout (cycles)
pub const DEFAULT_TIMEOUT: u32 = 64;

/// Delivered instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchRecord {
    pub cycle: u64,
    pub addr: Address,
    pub instruction: Word,
    pub error: bool,
}

/// Completed data access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessRecord {
    pub cycle: u64,
    pub kind: DataKind,
    pub addr: Address,
    pub wdata: Word,
    pub rdata: Word,
    pub error: bool,
}

/// Outcome of [`System::run`]
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub cycles: u64,
    /// Every request was answered and the controller went quiescent
    pub finished: bool,
    pub write_bus_errors: u64,
    pub stats: XcacheStats,
    pub fetches: Vec<FetchRecord>,
    pub accesses: Vec<AccessRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExternalPhase {
    Idle,
    Addr(ExternalWrite),
    Data(ExternalWrite),
}

/// Controller plus its environment
pub struct System {
    xcache: XCache,
    memory: Memory,
    fetches: VecDeque<Address>,
    requests: VecDeque<DataRequest>,
    external: VecDeque<ExternalWrite>,
    ext_phase: ExternalPhase,
    timeout: u32,
    wait_cycles: u32,
    cycles: u64,
    write_bus_errors: u64,
    fetch_log: Vec<FetchRecord>,
    access_log: Vec<AccessRecord>,
}

impl System {
    /// Create a system around a fresh controller
    ///
    /// # Errors
    ///
    /// Invalid controller configuration.
    pub fn new(config: XcacheConfig, memory: Memory) -> Result<Self> {
        Ok(Self {
            xcache: XCache::new(config)?,
            memory,
            fetches: VecDeque::new(),
            requests: VecDeque::new(),
            external: VecDeque::new(),
            ext_phase: ExternalPhase::Idle,
            timeout: DEFAULT_TIMEOUT,
            wait_cycles: 0,
            cycles: 0,
            write_bus_errors: 0,
            fetch_log: Vec::new(),
            access_log: Vec::new(),
        })
    }

    /// Build a system and load a request script into it
    pub fn from_script(config: XcacheConfig, script: &Script) -> Result<Self> {
        let mut memory = Memory::new(script.latency);
        for range in &script.error {
            memory = memory.with_error_range(range.base..range.base + range.size);
        }
        for init in &script.memory {
            memory.write_word(init.addr, init.data);
        }

        let mut system = Self::new(config, memory)?;
        for request in &script.request {
            match request.route() {
                Routed::Instruction(ireq) => system.push_fetch(ireq.addr),
                Routed::Data(dreq) => system.push_data(dreq),
            }
        }
        for write in &script.external_write {
            system.schedule_external_write(*write);
        }

        log::info!(
            "system: {} fetches, {} data requests, {} external writes",
            system.fetches.len(),
            system.requests.len(),
            system.external.len()
        );
        Ok(system)
    }

    /// Set the bus timeout (cycles)
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Queue an instruction fetch
    pub fn push_fetch(&mut self, addr: Address) {
        self.fetches.push_back(addr);
    }

    /// Queue a data request
    pub fn push_data(&mut self, request: DataRequest) {
        self.requests.push_back(request);
    }

    /// Schedule a write by the other master
    ///
    /// Writes start in schedule order, never before their cycle.
    pub fn schedule_external_write(&mut self, write: ExternalWrite) {
        let pos = self
            .external
            .iter()
            .position(|w| w.cycle > write.cycle)
            .unwrap_or(self.external.len());
        self.external.insert(pos, write);
    }

    /// Execute one clock cycle
    ///
    /// # Errors
    ///
    /// Fatal controller errors.
    pub fn step(&mut self) -> Result<()> {
        let out = self.xcache.bus_outputs();

        if self.ext_phase == ExternalPhase::Idle && !self.xcache.owns_bus() {
            if let Some(write) = self.external.front().copied() {
                if write.cycle <= self.cycles {
                    self.external.pop_front();
                    log::debug!(
                        "system: external write 0x{:08X} <- 0x{:08X} at cycle {}",
                        write.addr,
                        write.data,
                        self.cycles
                    );
                    self.ext_phase = ExternalPhase::Addr(write);
                }
            }
        }

        let gnt = out.req && self.ext_phase == ExternalPhase::Idle;

        let (addr_phase, wdata) = match self.ext_phase {
            ExternalPhase::Addr(write) => (
                Some(AddressPhase {
                    addr: write.addr,
                    read: false,
                    opc: BusOpcode::Wdu,
                }),
                None,
            ),
            ExternalPhase::Data(write) => (None, Some(write.data)),
            ExternalPhase::Idle => (
                out.addr.map(|addr| AddressPhase {
                    addr,
                    read: out.read,
                    opc: out.opc,
                }),
                out.wdata,
            ),
        };

        let (ack, data) = self.memory.cycle(addr_phase, wdata);

        // An aborted burst leaves its next address latched
        if ack == BusAck::Error {
            self.memory.abort();
        }

        let mut tout = false;
        if ack == BusAck::Wait && self.memory.is_busy() {
            self.wait_cycles += 1;
            if self.wait_cycles >= self.timeout {
                log::warn!("system: bus timeout after {} cycles", self.wait_cycles);
                self.memory.abort();
                self.wait_cycles = 0;
                tout = true;
            }
        } else {
            self.wait_cycles = 0;
        }

        let inputs = BusInputs {
            gnt,
            ack,
            data,
            tout,
            avalid: addr_phase.is_some(),
            read: addr_phase.is_some_and(|phase| phase.read),
            addr: addr_phase.map_or(0, |phase| phase.addr),
        };

        let ireq = self
            .fetches
            .front()
            .map_or(InstructionRequest::NONE, |&addr| InstructionRequest::fetch(addr));
        let dreq = self.requests.front().copied().unwrap_or(DataRequest::NONE);

        let result = self.xcache.tick(&ireq, &dreq, &inputs)?;

        if result.instruction.valid {
            self.fetches.pop_front();
            self.fetch_log.push(FetchRecord {
                cycle: self.cycles,
                addr: ireq.addr,
                instruction: result.instruction.instruction,
                error: result.instruction.error,
            });
        }
        if result.data.valid {
            self.requests.pop_front();
            self.access_log.push(AccessRecord {
                cycle: self.cycles,
                kind: dreq.kind,
                addr: dreq.addr,
                wdata: dreq.wdata,
                rdata: result.data.rdata,
                error: result.data.error,
            });
        }
        if result.write_bus_error {
            self.write_bus_errors += 1;
        }

        self.ext_phase = match self.ext_phase {
            ExternalPhase::Addr(write) => ExternalPhase::Data(write),
            ExternalPhase::Data(write) if ack == BusAck::Wait && !tout => ExternalPhase::Data(write),
            _ => ExternalPhase::Idle,
        };

        self.cycles += 1;
        Ok(())
    }

    /// All work done: no queued request, no scheduled write, controller
    /// quiescent
    pub fn is_done(&self) -> bool {
        self.fetches.is_empty()
            && self.requests.is_empty()
            && self.external.is_empty()
            && self.ext_phase == ExternalPhase::Idle
            && self.xcache.is_quiescent()
    }

    /// Run until done or `max_cycles` cycles have elapsed in total
    ///
    /// # Example
    ///
    /// ```
    /// use xcache::core::config::XcacheConfig;
    /// use xcache::core::system::{Memory, System};
    /// use xcache::core::xcache::DataRequest;
    ///
    /// let mut memory = Memory::new(0);
    /// memory.write_word(0x100, 42);
    ///
    /// let mut system = System::new(XcacheConfig::default(), memory).unwrap();
    /// system.push_data(DataRequest::read(0x100));
    ///
    /// let report = system.run(1000).unwrap();
    /// assert!(report.finished);
    /// assert_eq!(report.accesses[0].rdata, 42);
    /// ```
    pub fn run(&mut self, max_cycles: u64) -> Result<RunReport> {
        while !self.is_done() && self.cycles < max_cycles {
            self.step()?;
        }

        let finished = self.is_done();
        if !finished {
            log::warn!("system: stopped after {} cycles with work left", self.cycles);
        }
        Ok(self.report(finished))
    }

    fn report(&self, finished: bool) -> RunReport {
        RunReport {
            cycles: self.cycles,
            finished,
            write_bus_errors: self.write_bus_errors,
            stats: *self.xcache.stats(),
            fetches: self.fetch_log.clone(),
            accesses: self.access_log.clone(),
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn xcache(&self) -> &XCache {
        &self.xcache
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn fetch_log(&self) -> &[FetchRecord] {
        &self.fetch_log
    }

    pub fn access_log(&self) -> &[AccessRecord] {
        &self.access_log
    }

    pub fn write_bus_errors(&self) -> u64 {
        self.write_bus_errors
    }
}
