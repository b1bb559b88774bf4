// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Cache store tests
//!
//! - `basic`: lookup, probe, invalidate, word writes
//! - `replacement`: victim selection and eviction order
//! - `properties`: hit/miss and fill properties over random addresses

mod basic;
