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

//! Bus transaction controller
//!
//! The only component allowed to drive the shared bus. It multiplexes every
//! pending service request of the controller onto the single bus port.
//!
//! # Priorities
//!
//! Checked in this order on each visit of the idle state; only one request
//! is started per visit:
//!
//! 1. Write buffer not empty (drain one entry)
//! 2. Store-conditional write
//! 3. Data cache miss (burst read of one data line)
//! 4. Data uncached read
//! 5. Instruction cache miss (burst read of one instruction line)
//! 6. Instruction uncached read
//!
//! Lower classes can be starved by sustained traffic of higher ones.
//!
//! # Read protocol
//!
//! ```text
//! READ_REQ --gnt--> READ_AD --(burst)--> READ_DTAD ... --> READ_DT --> IDLE
//!                           \--(single)---------------------^
//! ```
//!
//! Address phase k is answered in the data phase of the next cycle, so a
//! burst overlaps the address of word k+1 with the data of word k.

mod signals;

pub use signals::{BusAck, BusInputs, BusOpcode, BusOutputs};

use crate::core::types::{Address, Word};
use crate::core::write_buffer::WriteEntry;
use std::fmt;

/// Bus controller FSM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusState {
    #[default]
    Idle,
    ReadReq,
    ReadAddr,
    ReadDataAddr,
    ReadData,
    WriteReq,
    WriteAddr,
    WriteData,
}

impl fmt::Display for BusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "PIBUS_IDLE",
            Self::ReadReq => "PIBUS_READ_REQ",
            Self::ReadAddr => "PIBUS_READ_AD",
            Self::ReadDataAddr => "PIBUS_READ_DTAD",
            Self::ReadData => "PIBUS_READ_DT",
            Self::WriteReq => "PIBUS_WRITE_REQ",
            Self::WriteAddr => "PIBUS_WRITE_AD",
            Self::WriteData => "PIBUS_WRITE_DT",
        };
        f.pad(name)
    }
}

/// Descriptor of the transaction being serviced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusTransaction {
    /// Start address
    pub addr: Address,
    /// Opcode (burst length or write width)
    pub opc: BusOpcode,
    /// Issued on behalf of the instruction cache
    pub ins: bool,
    /// Write issued by a store-conditional
    pub sc: bool,
    /// Write data
    pub wdata: Word,
}

/// Service requests raised by the cache controllers and consumed here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingRequests {
    pub icache_miss: bool,
    pub icache_unc: bool,
    pub dcache_miss: bool,
    pub dcache_unc: bool,
    pub dcache_sc: bool,
}

impl PendingRequests {
    /// Any request waiting for the bus
    pub fn any(&self) -> bool {
        self.icache_miss || self.icache_unc || self.dcache_miss || self.dcache_unc || self.dcache_sc
    }
}

/// Values the bus controller reads from the rest of the controller
#[derive(Debug, Clone, Copy)]
pub struct BusSources {
    /// Oldest write buffer entry
    pub wbuf_front: Option<WriteEntry>,
    /// Store-conditional address
    pub sc_addr: Address,
    /// Store-conditional data
    pub sc_wdata: Word,
    /// Data-side saved address (line address on a miss)
    pub dcache_addr: Address,
    /// Instruction-side saved address (word address)
    pub icache_addr: Address,
    /// Instruction line mask
    pub iline_mask: u32,
    /// Instruction line width (words)
    pub icache_words: usize,
    /// Data line width (words)
    pub dcache_words: usize,
    /// The reservation has been hit by an external write: drop any
    /// store-conditional write that has not reached its address phase
    pub sc_cancel: bool,
}

/// Bus-side registers of the controller
#[derive(Debug, Clone)]
pub struct BusPort {
    /// FSM state
    pub fsm: BusState,
    /// Words transferred in the current read
    pub wcount: usize,
    /// Current transaction
    pub txn: BusTransaction,
    /// Words received by the last read
    pub buf: Vec<Word>,
    /// A read completed (consumed by the requesting controller)
    pub rsp_ok: bool,
    /// The completed read failed
    pub rsp_error: bool,
    /// A store-conditional write completed (consumed by the data cache)
    pub sc_done: bool,
    /// That write failed on the bus
    pub sc_error: bool,
}

impl BusPort {
    /// Create an idle port able to buffer `max_words` per read
    pub fn new(max_words: usize) -> Self {
        Self {
            fsm: BusState::Idle,
            wcount: 0,
            txn: BusTransaction::default(),
            buf: vec![0; max_words],
            rsp_ok: false,
            rsp_error: false,
            sc_done: false,
            sc_error: false,
        }
    }

    /// Compute the next bus-side state
    ///
    /// Reads only `self` and `pending` (start-of-cycle values) and writes only
    /// `next` and `next_pending`.
    ///
    /// # Returns
    ///
    /// `true` if a posted write failed this cycle (timeout or error
    /// acknowledge). Such failures cannot be retried at this level and must
    /// be reported to the processor side. A failed store-conditional write
    /// is reported through `sc_error` instead.
    pub fn transition(
        &self,
        next: &mut BusPort,
        pending: &PendingRequests,
        next_pending: &mut PendingRequests,
        src: &BusSources,
        bus: &BusInputs,
    ) -> bool {
        let mut write_error = false;

        match self.fsm {
            BusState::Idle => {
                next.wcount = 0;

                if let Some(entry) = src.wbuf_front {
                    next.txn = BusTransaction {
                        addr: entry.addr,
                        opc: entry.opcode,
                        ins: false,
                        sc: false,
                        wdata: entry.data,
                    };
                    next.fsm = BusState::WriteReq;
                } else if pending.dcache_sc {
                    next_pending.dcache_sc = false;
                    if src.sc_cancel {
                        log::debug!("SC write to 0x{:08X} dropped before request", src.sc_addr);
                    } else {
                        next.txn = BusTransaction {
                            addr: src.sc_addr,
                            opc: BusOpcode::Wdu,
                            ins: false,
                            sc: true,
                            wdata: src.sc_wdata,
                        };
                        next.fsm = BusState::WriteReq;
                    }
                } else if pending.dcache_miss {
                    next.txn = Self::read(src.dcache_addr, BusOpcode::burst(src.dcache_words), false);
                    next.fsm = BusState::ReadReq;
                    next_pending.dcache_miss = false;
                } else if pending.dcache_unc {
                    next.txn = Self::read(src.dcache_addr, BusOpcode::Wdu, false);
                    next.fsm = BusState::ReadReq;
                    next_pending.dcache_unc = false;
                } else if pending.icache_miss {
                    next.txn = Self::read(
                        src.icache_addr & src.iline_mask,
                        BusOpcode::burst(src.icache_words),
                        true,
                    );
                    next.fsm = BusState::ReadReq;
                    next_pending.icache_miss = false;
                } else if pending.icache_unc {
                    next.txn = Self::read(src.icache_addr, BusOpcode::Wdu, true);
                    next.fsm = BusState::ReadReq;
                    next_pending.icache_unc = false;
                }

                if next.fsm != BusState::Idle {
                    log::trace!(
                        "bus: {} 0x{:08X} {} ({})",
                        if next.fsm == BusState::WriteReq { "write" } else { "read" },
                        next.txn.addr,
                        next.txn.opc,
                        if next.txn.ins { "ins" } else { "data" }
                    );
                }
            }
            BusState::ReadReq => {
                if bus.gnt {
                    next.fsm = BusState::ReadAddr;
                }
            }
            BusState::ReadAddr => {
                next.wcount = self.wcount + 1;
                next.fsm = if self.txn.opc == BusOpcode::Wdu {
                    BusState::ReadData
                } else {
                    BusState::ReadDataAddr
                };
            }
            BusState::ReadDataAddr => {
                if bus.tout || bus.ack == BusAck::Error {
                    log::warn!(
                        "bus: read error on burst 0x{:08X} word {}",
                        self.txn.addr,
                        self.wcount - 1
                    );
                    next.rsp_error = true;
                    next.rsp_ok = true;
                    next.fsm = BusState::Idle;
                } else if bus.ack == BusAck::Ready {
                    next.wcount = self.wcount + 1;
                    next.buf[self.wcount - 1] = bus.data;
                    if self.wcount == self.txn.opc.burst_words() - 1 {
                        next.fsm = BusState::ReadData;
                    }
                }
            }
            BusState::ReadData => {
                if bus.tout || bus.ack == BusAck::Error {
                    log::warn!("bus: read error at 0x{:08X}", self.txn.addr);
                    next.rsp_error = true;
                    next.rsp_ok = true;
                    next.fsm = BusState::Idle;
                } else if bus.ack == BusAck::Ready {
                    next.buf[self.wcount - 1] = bus.data;
                    next.rsp_ok = true;
                    next.fsm = BusState::Idle;
                }
            }
            BusState::WriteReq => {
                if self.txn.sc && src.sc_cancel {
                    log::debug!("SC write to 0x{:08X} aborted by snoop", self.txn.addr);
                    next.fsm = BusState::Idle;
                } else if bus.gnt {
                    next.fsm = BusState::WriteAddr;
                }
            }
            BusState::WriteAddr => {
                next.fsm = BusState::WriteData;
            }
            BusState::WriteData => {
                let failed = bus.tout || bus.ack == BusAck::Error;
                if failed || bus.ack == BusAck::Ready {
                    if self.txn.sc {
                        if failed {
                            log::warn!("bus: SC write error at 0x{:08X}", self.txn.addr);
                        }
                        next.sc_done = true;
                        next.sc_error = failed;
                    } else if failed {
                        log::error!(
                            "bus: write error at 0x{:08X} ({})",
                            self.txn.addr,
                            self.txn.opc
                        );
                        write_error = true;
                    }
                    next.fsm = BusState::Idle;
                }
            }
        }

        write_error
    }

    fn read(addr: Address, opc: BusOpcode, ins: bool) -> BusTransaction {
        BusTransaction {
            addr,
            opc,
            ins,
            sc: false,
            wdata: 0,
        }
    }

    /// Lines driven in the current state (Moore outputs)
    ///
    /// # Example
    ///
    /// ```
    /// use xcache::core::bus::BusPort;
    ///
    /// let port = BusPort::new(8);
    /// let out = port.outputs();
    /// assert!(!out.req);
    /// assert_eq!(out.addr, None);
    /// ```
    pub fn outputs(&self) -> BusOutputs {
        match self.fsm {
            BusState::Idle | BusState::ReadData => BusOutputs::default(),
            BusState::ReadReq | BusState::WriteReq => BusOutputs {
                req: true,
                ..Default::default()
            },
            BusState::ReadAddr | BusState::ReadDataAddr => BusOutputs {
                req: false,
                lock: self.wcount + 1 < self.txn.opc.burst_words(),
                read: true,
                opc: self.txn.opc,
                addr: Some(self.txn.addr.wrapping_add((self.wcount as u32) << 2)),
                wdata: None,
            },
            BusState::WriteAddr => BusOutputs {
                req: false,
                lock: false,
                read: false,
                opc: self.txn.opc,
                addr: Some(self.txn.addr),
                wdata: None,
            },
            BusState::WriteData => BusOutputs {
                wdata: Some(self.txn.wdata),
                ..Default::default()
            },
        }
    }

    /// Whether the port currently owns the bus (address or data phase)
    pub fn owns_bus(&self) -> bool {
        !matches!(
            self.fsm,
            BusState::Idle | BusState::ReadReq | BusState::WriteReq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> BusSources {
        BusSources {
            wbuf_front: None,
            sc_addr: 0,
            sc_wdata: 0,
            dcache_addr: 0x0000_0100,
            icache_addr: 0x0000_0208,
            iline_mask: 0xFFFF_FFF0,
            icache_words: 4,
            dcache_words: 4,
            sc_cancel: false,
        }
    }

    fn step(port: &mut BusPort, pending: &mut PendingRequests, src: &BusSources, bus: &BusInputs) -> bool {
        let mut next = port.clone();
        let mut next_pending = *pending;
        let err = port.transition(&mut next, pending, &mut next_pending, src, bus);
        *port = next;
        *pending = next_pending;
        err
    }

    #[test]
    fn test_priority_write_buffer_first() {
        let mut port = BusPort::new(4);
        let mut pending = PendingRequests {
            dcache_miss: true,
            icache_miss: true,
            ..Default::default()
        };
        let src = BusSources {
            wbuf_front: Some(WriteEntry {
                addr: 0x40,
                data: 7,
                opcode: BusOpcode::By1,
            }),
            ..sources()
        };

        step(&mut port, &mut pending, &src, &BusInputs::default());
        assert_eq!(port.fsm, BusState::WriteReq);
        assert_eq!(port.txn.opc, BusOpcode::By1);
        // Lower priority requests stay queued
        assert!(pending.dcache_miss && pending.icache_miss);
    }

    #[test]
    fn test_priority_data_before_instruction() {
        let mut port = BusPort::new(4);
        let mut pending = PendingRequests {
            dcache_unc: true,
            icache_miss: true,
            ..Default::default()
        };
        step(&mut port, &mut pending, &sources(), &BusInputs::default());
        assert_eq!(port.fsm, BusState::ReadReq);
        assert!(!port.txn.ins);
        assert_eq!(port.txn.opc, BusOpcode::Wdu);
        assert!(!pending.dcache_unc);
        assert!(pending.icache_miss);
    }

    #[test]
    fn test_instruction_miss_uses_line_address() {
        let mut port = BusPort::new(4);
        let mut pending = PendingRequests {
            icache_miss: true,
            ..Default::default()
        };
        step(&mut port, &mut pending, &sources(), &BusInputs::default());
        assert!(port.txn.ins);
        assert_eq!(port.txn.addr, 0x0000_0200);
        assert_eq!(port.txn.opc, BusOpcode::Wd4);
    }

    #[test]
    fn test_cancelled_sc_is_dropped() {
        let mut port = BusPort::new(4);
        let mut pending = PendingRequests {
            dcache_sc: true,
            ..Default::default()
        };
        let src = BusSources {
            sc_cancel: true,
            ..sources()
        };
        step(&mut port, &mut pending, &src, &BusInputs::default());
        assert_eq!(port.fsm, BusState::Idle);
        assert!(!pending.dcache_sc);
    }

    #[test]
    fn test_burst_read_sequence() {
        let mut port = BusPort::new(4);
        let mut pending = PendingRequests {
            dcache_miss: true,
            ..Default::default()
        };
        let src = sources();
        step(&mut port, &mut pending, &src, &BusInputs::default());
        assert!(port.outputs().req);

        let granted = BusInputs {
            gnt: true,
            ..Default::default()
        };
        step(&mut port, &mut pending, &src, &granted);
        assert_eq!(port.fsm, BusState::ReadAddr);
        let out = port.outputs();
        assert_eq!(out.addr, Some(0x100));
        assert!(out.lock);

        step(&mut port, &mut pending, &src, &BusInputs::default());
        assert_eq!(port.fsm, BusState::ReadDataAddr);

        let mut addresses = vec![];
        for word in 0..4u32 {
            addresses.extend(port.outputs().addr);
            let ready = BusInputs {
                ack: BusAck::Ready,
                data: 0xD0 + word,
                ..Default::default()
            };
            step(&mut port, &mut pending, &src, &ready);
        }
        assert_eq!(addresses, vec![0x104, 0x108, 0x10C]);
        assert_eq!(port.fsm, BusState::Idle);
        assert!(port.rsp_ok);
        assert!(!port.rsp_error);
        assert_eq!(port.buf, vec![0xD0, 0xD1, 0xD2, 0xD3]);
    }

    #[test]
    fn test_wait_holds_burst() {
        let mut port = BusPort::new(4);
        port.fsm = BusState::ReadDataAddr;
        port.wcount = 1;
        port.txn = BusPort::read(0x100, BusOpcode::Wd4, false);
        let mut pending = PendingRequests::default();

        step(&mut port, &mut pending, &sources(), &BusInputs::default());
        assert_eq!(port.fsm, BusState::ReadDataAddr);
        assert_eq!(port.wcount, 1);
        assert_eq!(port.outputs().addr, Some(0x104));
    }

    #[test]
    fn test_timeout_aborts_burst() {
        let mut port = BusPort::new(4);
        port.fsm = BusState::ReadDataAddr;
        port.wcount = 2;
        port.txn = BusPort::read(0x100, BusOpcode::Wd4, true);
        let mut pending = PendingRequests::default();
        let tout = BusInputs {
            tout: true,
            ..Default::default()
        };
        step(&mut port, &mut pending, &sources(), &tout);
        assert_eq!(port.fsm, BusState::Idle);
        assert!(port.rsp_ok && port.rsp_error);
    }

    #[test]
    fn test_write_error_reported() {
        let mut port = BusPort::new(4);
        port.fsm = BusState::WriteData;
        let mut pending = PendingRequests::default();
        let error = BusInputs {
            ack: BusAck::Error,
            ..Default::default()
        };
        assert!(step(&mut port, &mut pending, &sources(), &error));
        assert_eq!(port.fsm, BusState::Idle);
        // Writes never touch the read response flags
        assert!(!port.rsp_ok);
    }

    #[test]
    fn test_sc_write_error_not_reported_as_write_error() {
        let mut port = BusPort::new(4);
        port.fsm = BusState::WriteData;
        port.txn.sc = true;
        let mut pending = PendingRequests::default();
        let tout = BusInputs {
            tout: true,
            ..Default::default()
        };
        assert!(!step(&mut port, &mut pending, &sources(), &tout));
        assert!(port.sc_done && port.sc_error);
        assert_eq!(port.fsm, BusState::Idle);
    }

    #[test]
    fn test_sc_aborted_in_request_phase() {
        let mut port = BusPort::new(4);
        port.fsm = BusState::WriteReq;
        port.txn.sc = true;
        let mut pending = PendingRequests::default();
        let src = BusSources {
            sc_cancel: true,
            ..sources()
        };
        let granted = BusInputs {
            gnt: true,
            ..Default::default()
        };
        step(&mut port, &mut pending, &src, &granted);
        assert_eq!(port.fsm, BusState::Idle);
    }

    #[test]
    fn test_plain_write_not_aborted_by_snoop() {
        let mut port = BusPort::new(4);
        port.fsm = BusState::WriteReq;
        let mut pending = PendingRequests::default();
        let src = BusSources {
            sc_cancel: true,
            ..sources()
        };
        let granted = BusInputs {
            gnt: true,
            ..Default::default()
        };
        step(&mut port, &mut pending, &src, &granted);
        assert_eq!(port.fsm, BusState::WriteAddr);
        let out = port.outputs();
        assert!(!out.read);
        assert!(!out.lock);
    }
}
