// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Helper functions for controller tests

use super::super::*;
use crate::core::bus::BusAck;
use crate::core::types::Word;
use crate::core::config::CacheGeometry;
use crate::core::system::{AccessRecord, AddressPhase, ExternalWrite, FetchRecord, Memory, System};

/// Uncached address window of the default segment table
pub const UNCACHED: Address = 0x8000_0000;

/// 1x16x4 icache, 2x4x4 dcache, depth-2 write buffer
pub fn small_config() -> XcacheConfig {
    XcacheConfig {
        icache: CacheGeometry::new(1, 16, 4),
        dcache: CacheGeometry::new(2, 4, 4),
        wbuf_depth: 2,
        ..Default::default()
    }
}

/// Controller wired to a memory with no other master
///
/// Unlike `System`, the caller chooses every request and whether the bus
/// is granted.
pub struct Bench {
    pub xcache: XCache,
    pub memory: Memory,
    pub grant: bool,
}

impl Bench {
    pub fn new(config: XcacheConfig, memory: Memory) -> Self {
        Self {
            xcache: XCache::new(config).unwrap(),
            memory,
            grant: true,
        }
    }

    /// One cycle with the given requests
    pub fn cycle(&mut self, ireq: InstructionRequest, dreq: DataRequest) -> Result<CycleResult> {
        let out = self.xcache.bus_outputs();
        let phase = out.addr.map(|addr| AddressPhase {
            addr,
            read: out.read,
            opc: out.opc,
        });
        let (ack, data) = self.memory.cycle(phase, out.wdata);
        if ack == BusAck::Error {
            self.memory.abort();
        }
        let inputs = BusInputs {
            gnt: out.req && self.grant,
            ack,
            data,
            avalid: phase.is_some(),
            read: out.read,
            addr: out.addr.unwrap_or(0),
            ..Default::default()
        };
        self.xcache.tick(&ireq, &dreq, &inputs)
    }

    /// Present a data request until it is answered
    pub fn data(&mut self, dreq: DataRequest) -> DataResponse {
        for _ in 0..200 {
            let result = self.cycle(InstructionRequest::NONE, dreq).unwrap();
            if result.data.valid {
                return result.data;
            }
        }
        panic!("no response to {:?}", dreq);
    }

    /// Present a fetch until it is answered
    pub fn fetch(&mut self, addr: Address) -> InstructionResponse {
        for _ in 0..200 {
            let result = self.cycle(InstructionRequest::fetch(addr), DataRequest::NONE).unwrap();
            if result.instruction.valid {
                return result.instruction;
            }
        }
        panic!("no response to fetch 0x{:08X}", addr);
    }

    /// Idle cycles until the controller has nothing left to do
    pub fn settle(&mut self) {
        for _ in 0..200 {
            if self.xcache.is_quiescent() {
                return;
            }
            self.cycle(InstructionRequest::NONE, DataRequest::NONE).unwrap();
        }
        panic!("controller did not settle: {}", self.xcache.trace());
    }
}

/// Queue a data request and run until it is answered
pub fn run_data(system: &mut System, dreq: DataRequest) -> AccessRecord {
    let before = system.access_log().len();
    system.push_data(dreq);
    for _ in 0..500 {
        if system.access_log().len() > before {
            return system.access_log()[before];
        }
        system.step().unwrap();
    }
    panic!("no response to {:?}", dreq);
}

/// Queue a fetch and run until it is answered
pub fn run_fetch(system: &mut System, addr: Address) -> FetchRecord {
    let before = system.fetch_log().len();
    system.push_fetch(addr);
    for _ in 0..500 {
        if system.fetch_log().len() > before {
            return system.fetch_log()[before];
        }
        system.step().unwrap();
    }
    panic!("no response to fetch 0x{:08X}", addr);
}

/// Let another master write `data` at `addr` now and wait for it to land
pub fn external_write(system: &mut System, addr: Address, data: Word) {
    system.schedule_external_write(ExternalWrite {
        cycle: system.cycles(),
        addr,
        data,
    });
    system.run(system.cycles() + 200).unwrap();
}
