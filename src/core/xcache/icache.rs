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

//! Instruction cache controller
//!
//! Serves instruction fetches. A cacheable miss selects a victim, invalidates
//! it if needed, asks the bus controller for a burst and installs the line;
//! the instruction itself is delivered by the following idle-state hit.
//! Uncached fetches are forwarded as single-word reads.

use super::request::{InstructionRequest, InstructionResponse};
use super::{Registers, XCache};
use crate::core::types::Address;
use std::fmt;

/// Instruction cache FSM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ICacheState {
    #[default]
    Idle,
    MissSelect,
    MissInval,
    MissWait,
    MissUpdt,
    UncWait,
    UncGo,
    Error,
}

impl fmt::Display for ICacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "ICACHE_IDLE",
            Self::MissSelect => "ICACHE_MISS_SELECT",
            Self::MissInval => "ICACHE_MISS_INVAL",
            Self::MissWait => "ICACHE_MISS_WAIT",
            Self::MissUpdt => "ICACHE_MISS_UPDT",
            Self::UncWait => "ICACHE_UNC_WAIT",
            Self::UncGo => "ICACHE_UNC_GO",
            Self::Error => "ICACHE_ERROR",
        };
        f.pad(name)
    }
}

/// Instruction-side registers
#[derive(Debug, Clone, Default)]
pub(super) struct ICacheRegs {
    pub(super) fsm: ICacheState,
    /// Word address of the fetch being serviced
    pub(super) save_addr: Address,
    pub(super) save_way: usize,
    pub(super) save_set: usize,
}

impl XCache {
    pub(super) fn icache_transition(
        &mut self,
        cur: &Registers,
        next: &mut Registers,
        ireq: &InstructionRequest,
    ) -> InstructionResponse {
        let mut rsp = InstructionResponse::default();

        match cur.icache.fsm {
            ICacheState::Idle => {
                if ireq.valid {
                    next.icache.save_addr = ireq.addr & !0x3;

                    if self.cacheable.is_cacheable(ireq.addr) {
                        let lookup = self.icache.lookup(ireq.addr);
                        if lookup.hit {
                            rsp = InstructionResponse::instruction(lookup.data);
                        } else {
                            log::trace!("icache: miss 0x{:08X}", ireq.addr);
                            self.stats.imiss_count += 1;
                            self.stats.imiss_frz += 1;
                            next.pending.icache_miss = true;
                            next.icache.fsm = ICacheState::MissSelect;
                        }
                    } else {
                        self.stats.iunc_count += 1;
                        self.stats.iunc_frz += 1;
                        next.pending.icache_unc = true;
                        next.icache.fsm = ICacheState::UncWait;
                    }
                }
            }
            ICacheState::MissSelect => {
                self.stats.imiss_frz += 1;
                let victim = self.icache.victim_select(cur.icache.save_addr & self.iline_mask);
                next.icache.save_way = victim.way;
                next.icache.save_set = victim.set;
                next.icache.fsm = if victim.valid {
                    ICacheState::MissInval
                } else {
                    ICacheState::MissWait
                };
            }
            ICacheState::MissInval => {
                self.stats.imiss_frz += 1;
                if let Some(line) = self.icache.invalidate(cur.icache.save_way, cur.icache.save_set) {
                    log::trace!("icache: evict 0x{:08X}", line);
                }
                next.icache.fsm = ICacheState::MissWait;
            }
            ICacheState::MissWait => {
                self.stats.imiss_frz += 1;
                if cur.bus.txn.ins && cur.bus.rsp_ok {
                    next.bus.rsp_ok = false;
                    if cur.bus.rsp_error {
                        next.bus.rsp_error = false;
                        next.icache.fsm = ICacheState::Error;
                    } else {
                        next.icache.fsm = ICacheState::MissUpdt;
                    }
                }
            }
            ICacheState::MissUpdt => {
                self.stats.imiss_frz += 1;
                self.icache.update(
                    cur.icache.save_addr & self.iline_mask,
                    cur.icache.save_way,
                    cur.icache.save_set,
                    &cur.bus.buf,
                );
                next.icache.fsm = ICacheState::Idle;
            }
            ICacheState::UncWait => {
                self.stats.iunc_frz += 1;
                if cur.bus.txn.ins && cur.bus.rsp_ok {
                    next.bus.rsp_ok = false;
                    if cur.bus.rsp_error {
                        next.bus.rsp_error = false;
                        next.icache.fsm = ICacheState::Error;
                    } else {
                        next.icache.fsm = ICacheState::UncGo;
                    }
                }
            }
            ICacheState::UncGo => {
                // A fetch that moved on (branch) drops the stale word
                if ireq.valid && (ireq.addr & !0x3) == cur.icache.save_addr {
                    rsp = InstructionResponse::instruction(cur.bus.buf[0]);
                }
                next.icache.fsm = ICacheState::Idle;
            }
            ICacheState::Error => {
                rsp = InstructionResponse::error();
                next.icache.fsm = ICacheState::Idle;
            }
        }

        rsp
    }
}
