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

//! Custom assertions for cache controller testing

use xcache::core::system::{AccessRecord, System};

/// Assert memory contains expected value at address
#[allow(dead_code)]
pub fn assert_memory_word(system: &System, addr: u32, expected: u32) {
    let actual = system.memory().read_word(addr);
    assert_eq!(
        actual, expected,
        "Memory at 0x{:08X} mismatch: expected 0x{:08X}, got 0x{:08X}",
        addr, expected, actual
    );
}

/// Assert an access completed without error and returned `expected`
#[allow(dead_code)]
pub fn assert_read(access: &AccessRecord, expected: u32) {
    assert!(
        !access.error,
        "Access to 0x{:08X} failed unexpectedly",
        access.addr
    );
    assert_eq!(
        access.rdata, expected,
        "Read at 0x{:08X} mismatch: expected 0x{:08X}, got 0x{:08X}",
        access.addr, expected, access.rdata
    );
}

/// Assert the data cache holds (or does not hold) the line of `addr`
#[allow(dead_code)]
pub fn assert_dcache_holds(system: &System, addr: u32, expected: bool) {
    let hit = system.xcache().dcache().hit(addr).hit;
    assert_eq!(
        hit, expected,
        "dcache presence of 0x{:08X}: expected {}, got {}",
        addr, expected, hit
    );
}
