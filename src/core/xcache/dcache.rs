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

//! Data cache controller
//!
//! Serves reads, stores, LL/SC and maintenance requests.
//!
//! # Stores
//!
//! Write-through with no allocation: a store is acknowledged when accepted,
//! updates the cached copy on a hit, then waits in `WriteReq` until the
//! write buffer has room. While there it keeps accepting new requests
//! through the idle-state logic.
//!
//! # Reservations
//!
//! A load-linked arms a single reservation. A store-conditional succeeds
//! only if the reservation still covers its address when its write reaches
//! the bus address phase and the write then completes without error. Any
//! external write to the reserved word kills the reservation.
//!
//! # Snoop service
//!
//! Queued flush and invalidation requests are only served from the idle
//! state, before any new processor request.

use super::request::{xtn, DataKind, DataRequest, DataResponse, SC_ATOMIC, SC_NOT_ATOMIC};
use super::{Registers, XCache};
use crate::core::bus::BusState;
use crate::core::error::{Result, XcacheError};
use crate::core::types::{Address, ByteEnable, Word};
use std::fmt;

/// Data cache FSM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DCacheState {
    #[default]
    Idle,
    WriteUpdt,
    WriteReq,
    MissSelect,
    MissInval,
    MissWait,
    MissUpdt,
    UncWait,
    UncGo,
    Error,
    Inval,
    ScWait,
}

impl fmt::Display for DCacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "DCACHE_IDLE",
            Self::WriteUpdt => "DCACHE_WRITE_UPDT",
            Self::WriteReq => "DCACHE_WRITE_REQ",
            Self::MissSelect => "DCACHE_MISS_SELECT",
            Self::MissInval => "DCACHE_MISS_INVAL",
            Self::MissWait => "DCACHE_MISS_WAIT",
            Self::MissUpdt => "DCACHE_MISS_UPDT",
            Self::UncWait => "DCACHE_UNC_WAIT",
            Self::UncGo => "DCACHE_UNC_GO",
            Self::Error => "DCACHE_ERROR",
            Self::Inval => "DCACHE_INVAL",
            Self::ScWait => "DCACHE_SC_WAIT",
        };
        f.pad(name)
    }
}

/// LL/SC reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reservation {
    pub pending: bool,
    pub addr: Address,
}

/// Data-side registers
#[derive(Debug, Clone)]
pub(super) struct DCacheRegs {
    pub(super) fsm: DCacheState,
    /// Line address on a miss, word address on an uncached read, byte
    /// address on a store
    pub(super) save_addr: Address,
    pub(super) save_kind: DataKind,
    pub(super) save_wdata: Word,
    pub(super) save_be: ByteEnable,
    /// The store-conditional target was cached when accepted
    pub(super) save_cached: bool,
    pub(super) save_rdata: Word,
    pub(super) save_way: usize,
    pub(super) save_set: usize,
    pub(super) save_word: usize,
    pub(super) llsc: Reservation,
}

impl Default for DCacheRegs {
    fn default() -> Self {
        Self {
            fsm: DCacheState::Idle,
            save_addr: 0,
            save_kind: DataKind::Read,
            save_wdata: 0,
            save_be: ByteEnable::WORD,
            save_cached: false,
            save_rdata: 0,
            save_way: 0,
            save_set: 0,
            save_word: 0,
            llsc: Reservation::default(),
        }
    }
}

impl XCache {
    /// # Errors
    ///
    /// Fatal request errors: a store with an unsupported byte-enable
    /// pattern, an unsupported maintenance operation, or an extended read.
    pub(super) fn dcache_transition(
        &mut self,
        cur: &Registers,
        next: &mut Registers,
        dreq: &DataRequest,
    ) -> Result<DataResponse> {
        let mut rsp = DataResponse::default();

        match cur.dcache.fsm {
            DCacheState::WriteReq if !self.wbuf.wok() => {
                self.stats.write_frz += 1;
            }
            DCacheState::Idle | DCacheState::WriteReq => {
                rsp = self.dcache_idle(cur, next, dreq)?;
            }
            DCacheState::WriteUpdt => {
                self.dcache.write_word(
                    cur.dcache.save_way,
                    cur.dcache.save_set,
                    cur.dcache.save_word,
                    cur.dcache.save_wdata,
                    cur.dcache.save_be,
                );
                next.dcache.fsm = DCacheState::WriteReq;
            }
            DCacheState::MissSelect => {
                self.stats.dmiss_frz += 1;
                let victim = self.dcache.victim_select(cur.dcache.save_addr);
                next.dcache.save_way = victim.way;
                next.dcache.save_set = victim.set;
                next.dcache.fsm = if victim.valid {
                    DCacheState::MissInval
                } else {
                    DCacheState::MissWait
                };
            }
            DCacheState::MissInval => {
                self.stats.dmiss_frz += 1;
                if let Some(line) = self.dcache.invalidate(cur.dcache.save_way, cur.dcache.save_set) {
                    log::trace!("dcache: evict 0x{:08X}", line);
                }
                next.dcache.fsm = DCacheState::MissWait;
            }
            DCacheState::MissWait => {
                self.stats.dmiss_frz += 1;
                if !cur.bus.txn.ins && cur.bus.rsp_ok {
                    next.bus.rsp_ok = false;
                    if cur.bus.rsp_error {
                        next.bus.rsp_error = false;
                        next.dcache.fsm = DCacheState::Error;
                    } else {
                        next.dcache.fsm = DCacheState::MissUpdt;
                    }
                }
            }
            DCacheState::MissUpdt => {
                self.stats.dmiss_frz += 1;
                self.dcache.update(
                    cur.dcache.save_addr,
                    cur.dcache.save_way,
                    cur.dcache.save_set,
                    &cur.bus.buf,
                );
                next.dcache.fsm = DCacheState::Idle;
            }
            DCacheState::UncWait => {
                self.stats.dunc_frz += 1;
                if !cur.bus.txn.ins && cur.bus.rsp_ok {
                    next.bus.rsp_ok = false;
                    if cur.bus.rsp_error {
                        next.bus.rsp_error = false;
                        next.dcache.fsm = DCacheState::Error;
                    } else {
                        next.dcache.fsm = DCacheState::UncGo;
                    }
                }
            }
            DCacheState::UncGo => {
                if dreq.valid && (dreq.addr & !0x3) == cur.dcache.save_addr {
                    rsp = DataResponse::data(cur.bus.buf[0]);
                }
                next.dcache.fsm = DCacheState::Idle;
            }
            DCacheState::Error => {
                rsp = DataResponse::error();
                next.dcache.fsm = DCacheState::Idle;
            }
            DCacheState::Inval => {
                if let Some(line) = self.dcache.invalidate(cur.dcache.save_way, cur.dcache.save_set) {
                    log::debug!("dcache: line 0x{:08X} invalidated on request", line);
                }
                rsp = DataResponse::data(0);
                next.dcache.fsm = DCacheState::Idle;
            }
            DCacheState::ScWait => {
                let on_bus = cur.bus.txn.sc
                    && matches!(cur.bus.fsm, BusState::WriteAddr | BusState::WriteData);

                if cur.bus.sc_done {
                    next.bus.sc_done = false;
                    next.dcache.llsc.pending = false;
                    if cur.bus.sc_error {
                        self.stats.sc_ko += 1;
                        rsp = DataResponse::data(SC_NOT_ATOMIC);
                    } else {
                        self.stats.sc_ok += 1;
                        if cur.dcache.save_cached {
                            self.dcache.write_word(
                                cur.dcache.save_way,
                                cur.dcache.save_set,
                                cur.dcache.save_word,
                                cur.dcache.save_wdata,
                                ByteEnable::WORD,
                            );
                        }
                        rsp = DataResponse::data(SC_ATOMIC);
                    }
                    next.dcache.fsm = DCacheState::Idle;
                } else if cur.snoop.llsc_inval_req && !on_bus {
                    // Reservation lost before the write reached the bus
                    self.stats.sc_ko += 1;
                    next.dcache.llsc.pending = false;
                    next.pending.dcache_sc = false;
                    rsp = DataResponse::data(SC_NOT_ATOMIC);
                    next.dcache.fsm = DCacheState::Idle;
                }
            }
        }

        Ok(rsp)
    }

    /// Idle-state logic, also reached from `WriteReq` once the store has
    /// been posted
    fn dcache_idle(
        &mut self,
        cur: &Registers,
        next: &mut Registers,
        dreq: &DataRequest,
    ) -> Result<DataResponse> {
        next.dcache.fsm = DCacheState::Idle;

        if cur.snoop.llsc_inval_req {
            next.dcache.llsc.pending = false;
            next.snoop.llsc_inval_req = false;
        }

        if cur.snoop.flush_req {
            log::debug!("dcache: flush");
            self.dcache.reset();
            next.snoop.flush_req = false;
            next.snoop.dcache_inval_req = false;
            next.dcache.llsc.pending = false;
            return Ok(DataResponse::default());
        }

        if cur.snoop.dcache_inval_req {
            if let Some(line) = self.dcache.invalidate(cur.snoop.inval_way, cur.snoop.inval_set) {
                log::trace!("dcache: snoop invalidation 0x{:08X}", line);
            }
            next.snoop.dcache_inval_req = false;
            return Ok(DataResponse::default());
        }

        if !dreq.valid {
            return Ok(DataResponse::default());
        }

        next.dcache.save_kind = dreq.kind;

        match dreq.kind {
            DataKind::Read | DataKind::LoadLinked => {
                self.stats.dread_count += 1;
                let cacheable = self.cacheable.is_cacheable(dreq.addr);
                let hit = cacheable && self.dcache_lookup(next, dreq.addr);

                if dreq.kind == DataKind::LoadLinked {
                    next.dcache.llsc = Reservation {
                        pending: true,
                        addr: dreq.addr,
                    };
                }

                if hit {
                    return Ok(DataResponse::data(next.dcache.save_rdata));
                }

                if cacheable {
                    log::trace!("dcache: miss 0x{:08X}", dreq.addr);
                    self.stats.dmiss_count += 1;
                    self.stats.dmiss_frz += 1;
                    next.dcache.save_addr = dreq.addr & self.dline_mask;
                    next.pending.dcache_miss = true;
                    next.dcache.fsm = DCacheState::MissSelect;
                } else {
                    self.stats.dunc_count += 1;
                    self.stats.dunc_frz += 1;
                    next.dcache.save_addr = dreq.addr & !0x3;
                    next.pending.dcache_unc = true;
                    next.dcache.fsm = DCacheState::UncWait;
                }
                Ok(DataResponse::default())
            }
            DataKind::Write => {
                let be = ByteEnable::from_be(dreq.be.bits())?;
                self.stats.write_count += 1;
                let hit = self.cacheable.is_cacheable(dreq.addr) && self.dcache_lookup(next, dreq.addr);

                next.dcache.save_addr = dreq.addr;
                next.dcache.save_wdata = dreq.wdata;
                next.dcache.save_be = be;
                next.dcache.fsm = if hit {
                    DCacheState::WriteUpdt
                } else {
                    DCacheState::WriteReq
                };
                Ok(DataResponse::data(0))
            }
            DataKind::StoreConditional => {
                let reserved = cur.dcache.llsc.pending
                    && cur.dcache.llsc.addr == dreq.addr
                    && !cur.snoop.llsc_inval_req;

                if !reserved {
                    log::trace!("dcache: SC 0x{:08X} without reservation", dreq.addr);
                    self.stats.sc_ko += 1;
                    return Ok(DataResponse::data(SC_NOT_ATOMIC));
                }

                let hit = self.cacheable.is_cacheable(dreq.addr) && self.dcache_lookup(next, dreq.addr);
                next.dcache.save_addr = dreq.addr;
                next.dcache.save_wdata = dreq.wdata;
                next.dcache.save_cached = hit;
                next.pending.dcache_sc = true;
                next.dcache.fsm = DCacheState::ScWait;
                Ok(DataResponse::default())
            }
            DataKind::XtnWrite => match dreq.addr / 4 {
                xtn::DCACHE_INVAL => {
                    let probe = self.dcache.hit(dreq.wdata);
                    if probe.hit {
                        next.dcache.save_way = probe.way;
                        next.dcache.save_set = probe.set;
                        next.dcache.fsm = DCacheState::Inval;
                        Ok(DataResponse::default())
                    } else {
                        Ok(DataResponse::data(0))
                    }
                }
                xtn::SYNC => Ok(DataResponse::data(0)),
                op => {
                    log::error!("dcache: unsupported maintenance operation {}", op);
                    Err(XcacheError::UnsupportedMaintenance(op))
                }
            },
            DataKind::XtnRead => {
                log::error!("dcache: extended read {} not supported", dreq.addr / 4);
                Err(XcacheError::UnsupportedXtnRead(dreq.addr / 4))
            }
        }
    }

    /// Look up `addr` and save its coordinates and data
    fn dcache_lookup(&self, next: &mut Registers, addr: Address) -> bool {
        let lookup = self.dcache.lookup(addr);
        next.dcache.save_way = lookup.way;
        next.dcache.save_set = lookup.set;
        next.dcache.save_word = lookup.word;
        next.dcache.save_rdata = lookup.data;
        lookup.hit
    }
}
