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

//! Activity counters
//!
//! Counters never influence behavior. `*_frz` counters accumulate the
//! cycles the matching request class kept its FSM out of the idle state.

use serde::Serialize;
use std::fmt;

/// Controller activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct XcacheStats {
    pub total_cycles: u64,
    /// Instructions delivered (repeated deliveries of the same address excluded)
    pub total_inst: u64,
    pub imiss_count: u64,
    pub imiss_frz: u64,
    pub iunc_count: u64,
    pub iunc_frz: u64,
    pub dread_count: u64,
    pub dmiss_count: u64,
    pub dmiss_frz: u64,
    pub dunc_count: u64,
    pub dunc_frz: u64,
    pub write_count: u64,
    /// Cycles a store waited on a full write buffer
    pub write_frz: u64,
    pub sc_ok: u64,
    pub sc_ko: u64,
    pub write_bus_errors: u64,
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl XcacheStats {
    /// Instruction misses per delivered instruction
    pub fn imiss_rate(&self) -> f64 {
        ratio(self.imiss_count, self.total_inst)
    }

    /// Data misses per cacheable read
    pub fn dmiss_rate(&self) -> f64 {
        ratio(self.dmiss_count, self.cached_reads())
    }

    fn cached_reads(&self) -> u64 {
        self.dread_count.saturating_sub(self.dunc_count)
    }

    /// Cacheable reads per delivered instruction
    pub fn cached_read_rate(&self) -> f64 {
        ratio(self.cached_reads(), self.total_inst)
    }

    /// Uncached reads per delivered instruction
    pub fn uncached_read_rate(&self) -> f64 {
        ratio(self.dunc_count, self.total_inst)
    }

    /// Stores per delivered instruction
    pub fn write_rate(&self) -> f64 {
        ratio(self.write_count, self.total_inst)
    }

    /// Average penalty of an instruction miss (cycles)
    pub fn imiss_cost(&self) -> f64 {
        ratio(self.imiss_frz, self.imiss_count)
    }

    /// Average penalty of a data miss (cycles)
    pub fn dmiss_cost(&self) -> f64 {
        ratio(self.dmiss_frz, self.dmiss_count)
    }

    /// Average penalty of an uncached data read (cycles)
    pub fn unc_cost(&self) -> f64 {
        ratio(self.dunc_frz, self.dunc_count)
    }

    /// Average stall of a store on a full write buffer (cycles)
    pub fn write_cost(&self) -> f64 {
        ratio(self.write_frz, self.write_count)
    }

    /// Cycles per delivered instruction
    pub fn cpi(&self) -> f64 {
        ratio(self.total_cycles, self.total_inst)
    }
}

impl fmt::Display for XcacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cycles            {}", self.total_cycles)?;
        writeln!(f, "instructions      {}", self.total_inst)?;
        writeln!(f, "CPI               {:.3}", self.cpi())?;
        writeln!(f, "cached read rate  {:.3}", self.cached_read_rate())?;
        writeln!(f, "unc read rate     {:.3}", self.uncached_read_rate())?;
        writeln!(f, "write rate        {:.3}", self.write_rate())?;
        writeln!(
            f,
            "imiss             {} ({:.3}/inst, {:.1} cycles)",
            self.imiss_count,
            self.imiss_rate(),
            self.imiss_cost()
        )?;
        writeln!(f, "iunc              {} ({} cycles)", self.iunc_count, self.iunc_frz)?;
        writeln!(f, "dread             {}", self.dread_count)?;
        writeln!(
            f,
            "dmiss             {} ({:.3}/cached read, {:.1} cycles)",
            self.dmiss_count,
            self.dmiss_rate(),
            self.dmiss_cost()
        )?;
        writeln!(f, "dunc              {} ({} cycles)", self.dunc_count, self.dunc_frz)?;
        writeln!(f, "unc cost          {:.1} cycles", self.unc_cost())?;
        writeln!(
            f,
            "writes            {} ({} stall cycles, {:.2}/write)",
            self.write_count,
            self.write_frz,
            self.write_cost()
        )?;
        writeln!(f, "sc                {} ok / {} ko", self.sc_ok, self.sc_ko)?;
        write!(f, "write bus errors  {}", self.write_bus_errors)
    }
}
