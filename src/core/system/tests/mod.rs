// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! System module tests
//!
//! - `basic`: construction, run loop and reports
//! - `arbitration`: sharing the bus with the other master
//! - `scripts`: building and running a system from a request script

use crate::core::config::XcacheConfig;


fn config() -> XcacheConfig {
    use crate::core::config::CacheGeometry;

    XcacheConfig {
        icache: CacheGeometry::new(2, 8, 4),
        dcache: CacheGeometry::new(2, 8, 4),
        wbuf_depth: 4,
        ..Default::default()
    }
}
