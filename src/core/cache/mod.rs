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

//! Set-associative cache store
//!
//! This module implements the line storage shared by the instruction and
//! data caches. The store only keeps lines; deciding *when* to fill,
//! evict or write is the job of the controller FSMs that own it.
//!
//! # Organization
//!
//! ```text
//! Address format (32 bits), for W words per line and S sets:
//! [31 : 2+log2(W)+log2(S)]  Tag
//! [.. : 2+log2(W)]          Set index
//! [.. : 2]                  Word index
//! [1:0]                     Byte offset
//! ```
//!
//! Lines live in a flat arena indexed by `set * ways + way`; no allocation
//! happens after construction.
//!
//! # Replacement
//!
//! `victim_select` prefers the lowest-index invalid way. When the whole set
//! is valid it returns the way under the set's round-robin pointer, which
//! advances past each newly installed line.
//!
//! # Example
//!
//! ```
//! use xcache::core::cache::SetAssociativeCache;
//! use xcache::core::config::CacheGeometry;
//!
//! let mut cache = SetAssociativeCache::new(CacheGeometry::new(2, 4, 4), "dcache").unwrap();
//!
//! let victim = cache.victim_select(0x0000_0100);
//! assert!(!victim.valid);
//! cache.update(0x0000_0100, victim.way, victim.set, &[1, 2, 3, 4]);
//!
//! let lookup = cache.lookup(0x0000_0108);
//! assert!(lookup.hit);
//! assert_eq!(lookup.data, 3);
//! ```

use crate::core::config::CacheGeometry;
use crate::core::error::Result;
use crate::core::types::{Address, ByteEnable, Word};

#[cfg(test)]
mod tests;

/// One cache line
#[derive(Debug, Clone)]
struct CacheLine {
    /// Valid bit
    valid: bool,
    /// Address tag
    tag: u32,
    /// Line payload
    words: Vec<Word>,
}

impl CacheLine {
    fn new(words: usize) -> Self {
        Self {
            valid: false,
            tag: 0,
            words: vec![0; words],
        }
    }
}

/// Result of a tag-only probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Whether a valid line holds the address
    pub hit: bool,
    /// Matching way (0 on a miss)
    pub way: usize,
    /// Set index of the address
    pub set: usize,
    /// Word index of the address within its line
    pub word: usize,
}

/// Result of a data lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// Whether a valid line holds the address
    pub hit: bool,
    /// Word read on a hit (0 on a miss)
    pub data: Word,
    /// Matching way (0 on a miss)
    pub way: usize,
    /// Set index of the address
    pub set: usize,
    /// Word index of the address within its line
    pub word: usize,
}

/// Replacement candidate for a line address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    /// Whether the chosen slot currently holds a valid line
    pub valid: bool,
    /// Line address held by the slot (meaningful only when `valid`)
    pub line_addr: Address,
    /// Chosen way
    pub way: usize,
    /// Set of the line address
    pub set: usize,
}

/// Set-associative cache store
pub struct SetAssociativeCache {
    geometry: CacheGeometry,
    /// Bit position of the set index
    set_shift: u32,
    /// Bit position of the tag
    tag_shift: u32,
    /// Lines, set-major
    lines: Vec<CacheLine>,
    /// Round-robin replacement pointer per set
    next_victim: Vec<usize>,
}

impl SetAssociativeCache {
    /// Create an empty cache store
    ///
    /// # Arguments
    ///
    /// * `geometry` - Ways, sets and words per line
    /// * `name` - Cache name used in configuration diagnostics
    ///
    /// # Errors
    ///
    /// Fails if the geometry exceeds the hardware limits (more than 16
    /// ways, unsupported line width, sets not a power of two).
    pub fn new(geometry: CacheGeometry, name: &'static str) -> Result<Self> {
        geometry.validate(name)?;

        let set_shift = 2 + geometry.words.trailing_zeros();
        let tag_shift = set_shift + geometry.sets.trailing_zeros();

        Ok(Self {
            geometry,
            set_shift,
            tag_shift,
            lines: vec![CacheLine::new(geometry.words); geometry.ways * geometry.sets],
            next_victim: vec![0; geometry.sets],
        })
    }

    /// Cache geometry
    pub fn geometry(&self) -> CacheGeometry {
        self.geometry
    }

    #[inline(always)]
    fn word_index(&self, addr: Address) -> usize {
        ((addr >> 2) as usize) & (self.geometry.words - 1)
    }

    #[inline(always)]
    fn set_index(&self, addr: Address) -> usize {
        ((addr >> self.set_shift) as usize) & (self.geometry.sets - 1)
    }

    #[inline(always)]
    fn tag(&self, addr: Address) -> u32 {
        addr.checked_shr(self.tag_shift).unwrap_or(0)
    }

    #[inline(always)]
    fn slot(&self, way: usize, set: usize) -> usize {
        set * self.geometry.ways + way
    }

    /// Rebuild the line address of a tag stored in a set
    #[inline(always)]
    fn line_address(&self, tag: u32, set: usize) -> Address {
        tag.checked_shl(self.tag_shift).unwrap_or(0) | ((set as u32) << self.set_shift)
    }

    fn find(&self, addr: Address) -> Probe {
        let set = self.set_index(addr);
        let word = self.word_index(addr);
        let tag = self.tag(addr);

        let way = (0..self.geometry.ways).find(|&way| {
            let line = &self.lines[self.slot(way, set)];
            line.valid && line.tag == tag
        });

        Probe {
            hit: way.is_some(),
            way: way.unwrap_or(0),
            set,
            word,
        }
    }

    /// Look up an address and read its word on a hit
    ///
    /// Never evicts anything. Set and word coordinates are returned even on
    /// a miss so the caller can save them.
    pub fn lookup(&self, addr: Address) -> Lookup {
        let probe = self.find(addr);
        let data = if probe.hit {
            self.lines[self.slot(probe.way, probe.set)].words[probe.word]
        } else {
            0
        };

        Lookup {
            hit: probe.hit,
            data,
            way: probe.way,
            set: probe.set,
            word: probe.word,
        }
    }

    /// Tag-only presence check (no data read)
    ///
    /// Used by the snoop unit and by cache-maintenance requests.
    pub fn hit(&self, addr: Address) -> Probe {
        self.find(addr)
    }

    /// Choose the slot a line address would be installed in
    ///
    /// Nothing is evicted here; the caller invalidates the victim
    /// separately when `valid` is set.
    pub fn victim_select(&self, line_addr: Address) -> Victim {
        let set = self.set_index(line_addr);

        let free = (0..self.geometry.ways).find(|&way| !self.lines[self.slot(way, set)].valid);
        let way = free.unwrap_or(self.next_victim[set]);
        let line = &self.lines[self.slot(way, set)];

        Victim {
            valid: line.valid,
            line_addr: self.line_address(line.tag, set),
            way,
            set,
        }
    }

    /// Invalidate one slot
    ///
    /// # Returns
    ///
    /// The line address the slot held, or `None` if it was already invalid.
    pub fn invalidate(&mut self, way: usize, set: usize) -> Option<Address> {
        let slot = self.slot(way, set);
        let tag = self.lines[slot].tag;
        let line = &mut self.lines[slot];
        if !line.valid {
            return None;
        }
        line.valid = false;
        Some(self.line_address(tag, set))
    }

    /// Install a full line fetched from the bus
    ///
    /// `words` must hold at least one line of data; extra words are ignored.
    pub fn update(&mut self, line_addr: Address, way: usize, set: usize, words: &[Word]) {
        let tag = self.tag(line_addr);
        let count = self.geometry.words;
        let slot = self.slot(way, set);

        let line = &mut self.lines[slot];
        line.valid = true;
        line.tag = tag;
        line.words.copy_from_slice(&words[..count]);

        self.next_victim[set] = (way + 1) % self.geometry.ways;
    }

    /// Write one word in place with byte granularity
    pub fn write_word(&mut self, way: usize, set: usize, word: usize, data: Word, be: ByteEnable) {
        let mask = be.mask();
        let slot = self.slot(way, set);
        let cell = &mut self.lines[slot].words[word];
        *cell = (*cell & !mask) | (data & mask);
    }

    /// Invalidate every line and reset the replacement pointers
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.valid = false;
        }
        self.next_victim.fill(0);
    }

    /// Number of valid lines
    pub fn len(&self) -> usize {
        self.lines.iter().filter(|line| line.valid).count()
    }

    /// Check if no line is valid
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| !line.valid)
    }
}
