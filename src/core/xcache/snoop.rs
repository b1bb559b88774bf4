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

//! Snoop unit
//!
//! Watches the address phases of other masters. An external write that
//! hits the data cache, or that targets the line currently being refilled,
//! queues an invalidation for the data cache controller. A second, different
//! hit while one is still queued and the controller is busy degrades to a
//! whole-cache flush. A write to the reserved word kills the LL/SC
//! reservation.

use super::dcache::DCacheState;
use super::{Registers, XCache};
use crate::core::bus::{BusInputs, BusState};
use crate::core::types::Address;

/// Snoop-side registers
#[derive(Debug, Clone, Default)]
pub(super) struct SnoopRegs {
    /// Pending single-line invalidation
    pub(super) dcache_inval_req: bool,
    pub(super) inval_way: usize,
    pub(super) inval_set: usize,
    /// Line address of the pending invalidation
    pub(super) address_save: Address,
    /// The reservation was hit by an external write
    pub(super) llsc_inval_req: bool,
    /// Whole data cache must be invalidated
    pub(super) flush_req: bool,
}

impl XCache {
    /// Runs after the data cache controller so it sees this cycle's array
    /// updates.
    ///
    /// # Returns
    ///
    /// `true` if the reservation was hit in this very cycle.
    pub(super) fn snoop_transition(
        &mut self,
        cur: &Registers,
        next: &mut Registers,
        bus: &BusInputs,
    ) -> bool {
        if !self.config.snoop {
            return false;
        }

        // Our own write address phase is not an external write
        let external_write = bus.avalid && !bus.read && cur.bus.fsm != BusState::WriteAddr;
        if !external_write {
            return false;
        }

        let line = bus.addr & self.dline_mask;
        let probe = self.dcache.hit(bus.addr);
        let wait_hit = line == cur.dcache.save_addr
            && matches!(cur.dcache.fsm, DCacheState::MissWait | DCacheState::MissUpdt);

        if cur.snoop.dcache_inval_req
            && (probe.hit || wait_hit)
            && line != cur.snoop.address_save
            && cur.dcache.fsm != DCacheState::Idle
        {
            log::debug!(
                "snoop: second invalidation 0x{:08X} while 0x{:08X} pending, flushing dcache",
                line,
                cur.snoop.address_save
            );
            next.snoop.flush_req = true;
        }

        if probe.hit {
            log::trace!("snoop: hit 0x{:08X}", bus.addr);
            next.snoop.dcache_inval_req = true;
            next.snoop.inval_way = probe.way;
            next.snoop.inval_set = probe.set;
            next.snoop.address_save = line;
        } else if wait_hit {
            log::trace!("snoop: hit on refill 0x{:08X}", bus.addr);
            next.snoop.dcache_inval_req = true;
            next.snoop.inval_way = cur.dcache.save_way;
            next.snoop.inval_set = cur.dcache.save_set;
            next.snoop.address_save = line;
        }

        let llsc_inval =
            cur.dcache.llsc.pending && (bus.addr & !0x3) == (cur.dcache.llsc.addr & !0x3);
        if llsc_inval {
            log::debug!("snoop: reservation 0x{:08X} lost", cur.dcache.llsc.addr);
            next.snoop.llsc_inval_req = true;
        }

        llsc_inval
    }
}
