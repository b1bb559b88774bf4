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

//! Cycle-accurate cache controller library
//!
//! This library models a write-through instruction/data cache controller
//! sitting between a processor and a shared, arbitrated bus. It includes
//! a posted write buffer, LL/SC reservations and a snoop unit that keeps
//! the data cache coherent with writes from other bus masters.
//!
//! # Example
//!
//! ```
//! use xcache::core::config::XcacheConfig;
//! use xcache::core::system::{Memory, System};
//! use xcache::core::types::ByteEnable;
//! use xcache::core::xcache::DataRequest;
//!
//! let mut memory = Memory::new(1);
//! memory.write_word(0x40, 7);
//!
//! let mut system = System::new(XcacheConfig::default(), memory).unwrap();
//! system.push_data(DataRequest::write(0x44, 9, ByteEnable::WORD));
//! system.push_data(DataRequest::read(0x40));
//!
//! let report = system.run(1000).unwrap();
//! assert_eq!(report.accesses[1].rdata, 7);
//! assert_eq!(system.memory().read_word(0x44), 9);
//! ```

pub mod core;
