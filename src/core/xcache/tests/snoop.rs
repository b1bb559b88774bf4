// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Snoop invalidation tests

use super::super::*;
use super::helpers::*;
use crate::core::system::{ExternalWrite, Memory, System};
use crate::core::types::ByteEnable;

fn memory(latency: u32) -> Memory {
    let mut memory = Memory::new(latency);
    for i in 0..256 {
        memory.write_word(i * 4, i);
    }
    memory
}

#[test]
fn test_external_write_invalidates_cached_line() {
    let mut system = System::new(small_config(), memory(0)).unwrap();
    run_data(&mut system, DataRequest::read(0x100));

    external_write(&mut system, 0x104, 0x99);
    assert!(!system.xcache().dcache().hit(0x100).hit);

    // Fresh data after the refill
    assert_eq!(run_data(&mut system, DataRequest::read(0x104)).rdata, 0x99);
    assert_eq!(system.xcache().stats().dmiss_count, 2);
}

#[test]
fn test_external_write_elsewhere_keeps_line() {
    let mut system = System::new(small_config(), memory(0)).unwrap();
    run_data(&mut system, DataRequest::read(0x100));

    external_write(&mut system, 0x110, 0x99);
    assert!(system.xcache().dcache().hit(0x100).hit);
}

#[test]
fn test_own_store_does_not_invalidate() {
    let mut system = System::new(small_config(), memory(0)).unwrap();
    run_data(&mut system, DataRequest::read(0x100));
    run_data(&mut system, DataRequest::write(0x104, 5, ByteEnable::WORD));
    system.run(system.cycles() + 100).unwrap();

    assert_eq!(system.memory().write_log().len(), 1);
    assert!(system.xcache().dcache().hit(0x100).hit);
    assert_eq!(run_data(&mut system, DataRequest::read(0x104)).rdata, 5);
}

#[test]
fn test_external_write_to_line_being_refilled() {
    let mut system = System::new(small_config(), memory(0)).unwrap();

    // Cycle 0: miss, 1: victim chosen and bus requested, 2: waiting for
    // the bus when the other master writes into the line
    system.schedule_external_write(ExternalWrite {
        cycle: 2,
        addr: 0x108,
        data: 0x77,
    });
    let rsp = run_data(&mut system, DataRequest::read(0x108));

    assert_eq!(rsp.rdata, 0x77);
    // The refilled line was invalidated once and fetched again
    assert_eq!(system.xcache().stats().dmiss_count, 2);
}

#[test]
fn test_second_pending_invalidation_flushes() {
    let mut system = System::new(small_config(), memory(8)).unwrap();
    for addr in [0x100, 0x210] {
        run_data(&mut system, DataRequest::read(addr));
    }
    assert_eq!(system.xcache().dcache().len(), 2);

    // Keep the data side busy with a long miss while two different cached
    // lines are written by the other master
    let start = system.cycles();
    for (addr, data) in [(0x100, 0xA), (0x210, 0xB)] {
        system.schedule_external_write(ExternalWrite {
            cycle: start + 2,
            addr,
            data,
        });
    }
    assert_eq!(run_data(&mut system, DataRequest::read(0x320)).rdata, 0x320 / 4);
    system.run(system.cycles() + 500).unwrap();

    // Everything flushed; only the line read after the flush is present
    assert!(!system.xcache().dcache().hit(0x100).hit);
    assert!(!system.xcache().dcache().hit(0x210).hit);
    assert_eq!(system.xcache().dcache().len(), 1);
    assert_eq!(run_data(&mut system, DataRequest::read(0x210)).rdata, 0xB);
}

#[test]
fn test_snoop_disabled_keeps_stale_line() {
    let config = XcacheConfig {
        snoop: false,
        ..small_config()
    };
    let mut system = System::new(config, memory(0)).unwrap();
    run_data(&mut system, DataRequest::read(0x100));

    external_write(&mut system, 0x100, 0x99);
    assert_eq!(run_data(&mut system, DataRequest::read(0x100)).rdata, 0x40);
}
