// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Cache controller tests
//!
//! - `icache`: instruction fetch hit/miss, uncached and error paths
//! - `dcache`: reads, stores, maintenance requests, fatal requests
//! - `write_order`: write buffer backpressure and bus store order
//! - `llsc`: load-linked / store-conditional
//! - `snoop`: invalidation by other bus masters
//! - `bus_errors`: error and timeout recovery
//! - `properties`: sequential consistency over random access streams

mod helpers;
mod snoop;
mod write_order;
