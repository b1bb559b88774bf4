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

//! Core cache controller components
//!
//! - Set-associative line store shared by both caches
//! - Posted write buffer
//! - Bus port and its transaction FSM
//! - The controller itself (instruction, data and snoop FSMs)
//! - A system harness with a memory target and a second bus master

pub mod bus;
pub mod cache;
pub mod config;
pub mod error;
pub mod system;
pub mod types;
pub mod write_buffer;
pub mod xcache;

// Re-export commonly used types
pub use config::XcacheConfig;
pub use error::{Result, XcacheError};
pub use system::System;
pub use xcache::XCache;
