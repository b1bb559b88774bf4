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

//! Controller configuration
//!
//! All parameters are fixed when the controller is built and never change
//! afterwards. A configuration can be written by hand or loaded from TOML:
//!
//! ```toml
//! wbuf_depth = 8
//! snoop = true
//!
//! [icache]
//! ways = 4
//! sets = 64
//! words = 8
//!
//! [dcache]
//! ways = 4
//! sets = 64
//! words = 8
//!
//! [segments]
//! msb_bits = 8
//!
//! [[segments.segments]]
//! name = "ram"
//! base = 0x00000000
//! size = 0x80000000
//! cacheable = true
//! ```
//!
//! # Cacheability
//!
//! Whether an address may be cached is decided by its segment. The segment
//! table is flattened into a lookup table indexed by the `msb_bits` most
//! significant address bits, so the decision costs one shift and one index.

use crate::core::error::{Result, XcacheError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Maximum associativity supported by the cache store
pub const MAX_WAYS: usize = 16;

/// Geometry of one cache store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheGeometry {
    /// Number of ways per set (1-16)
    pub ways: usize,
    /// Number of sets (power of two)
    pub sets: usize,
    /// Number of 32-bit words per line (1, 2, 4, 8, 16 or 32)
    pub words: usize,
}

impl CacheGeometry {
    /// Create a new cache geometry
    pub const fn new(ways: usize, sets: usize, words: usize) -> Self {
        Self { ways, sets, words }
    }

    /// Check the geometry against the hardware limits
    ///
    /// # Arguments
    ///
    /// * `cache` - Cache name used in the diagnostic ("icache" or "dcache")
    ///
    /// # Errors
    ///
    /// Returns the first offending parameter.
    pub fn validate(&self, cache: &'static str) -> Result<()> {
        if self.ways == 0 || self.ways > MAX_WAYS {
            return Err(XcacheError::InvalidWays {
                cache,
                ways: self.ways,
            });
        }
        if !self.sets.is_power_of_two() {
            return Err(XcacheError::InvalidSets {
                cache,
                sets: self.sets,
            });
        }
        if !matches!(self.words, 1 | 2 | 4 | 8 | 16 | 32) {
            return Err(XcacheError::InvalidLineWords {
                cache,
                words: self.words,
            });
        }
        Ok(())
    }

    /// Mask selecting the line address bits of a byte address
    ///
    /// A 4-word line gives `0xFFFF_FFF0`, a 1-word line `0xFFFF_FFFC`.
    #[inline(always)]
    pub fn line_mask(&self) -> u32 {
        !((self.words as u32 * 4) - 1)
    }

    /// Total capacity in bytes
    pub fn capacity_bytes(&self) -> usize {
        self.ways * self.sets * self.words * 4
    }
}

/// One address segment of the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment name (for diagnostics)
    pub name: String,
    /// Base byte address
    pub base: u32,
    /// Size in bytes
    pub size: u32,
    /// Whether accesses to this segment go through the caches
    pub cacheable: bool,
}

/// Segment table describing which address ranges are cacheable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentTable {
    /// Number of most significant address bits used to index the table
    #[serde(default = "default_msb_bits")]
    pub msb_bits: u32,
    /// Declared segments; slots covered by no segment are uncached
    #[serde(default)]
    pub segments: Vec<Segment>,
}

fn default_msb_bits() -> u32 {
    8
}

impl SegmentTable {
    /// Create an empty segment table
    pub fn new(msb_bits: u32) -> Self {
        Self {
            msb_bits,
            segments: Vec::new(),
        }
    }

    /// Add a segment (builder style)
    ///
    /// # Example
    ///
    /// ```
    /// use xcache::core::config::SegmentTable;
    ///
    /// let table = SegmentTable::new(8)
    ///     .with_segment("ram", 0x0000_0000, 0x1000_0000, true)
    ///     .with_segment("tty", 0x9000_0000, 0x0000_1000, false);
    /// let lookup = table.cached_table().unwrap();
    /// assert!(lookup.is_cacheable(0x0000_0100));
    /// assert!(!lookup.is_cacheable(0x9000_0000));
    /// ```
    pub fn with_segment(mut self, name: &str, base: u32, size: u32, cacheable: bool) -> Self {
        self.segments.push(Segment {
            name: name.to_string(),
            base,
            size,
            cacheable,
        });
        self
    }

    /// Flatten the segments into an MSB-indexed cacheability table
    ///
    /// # Errors
    ///
    /// - `InvalidSegmentBits` if `msb_bits` is outside 1-16
    /// - `Config` if two segments with different cacheability share a slot
    pub fn cached_table(&self) -> Result<CacheabilityTable> {
        if self.msb_bits == 0 || self.msb_bits > 16 {
            return Err(XcacheError::InvalidSegmentBits(self.msb_bits));
        }

        let shift = 32 - self.msb_bits;
        let slots = 1usize << self.msb_bits;
        let mut owner: Vec<Option<(bool, &str)>> = vec![None; slots];

        for seg in &self.segments {
            if seg.size == 0 {
                continue;
            }
            let first = (seg.base >> shift) as usize;
            let last_addr = u64::from(seg.base) + u64::from(seg.size) - 1;
            let last = ((last_addr.min(u64::from(u32::MAX)) as u32) >> shift) as usize;

            for slot in &mut owner[first..=last] {
                match slot {
                    Some((cacheable, name)) if *cacheable != seg.cacheable => {
                        return Err(XcacheError::Config(format!(
                            "segments '{}' and '{}' share an address slot with different cacheability",
                            name, seg.name
                        )));
                    }
                    _ => *slot = Some((seg.cacheable, seg.name.as_str())),
                }
            }
        }

        Ok(CacheabilityTable {
            shift,
            mask: (slots - 1) as u32,
            cached: owner
                .into_iter()
                .map(|slot| slot.map(|(c, _)| c).unwrap_or(false))
                .collect(),
        })
    }
}

impl Default for SegmentTable {
    /// Cacheable lower half, uncached upper half (peripherals)
    fn default() -> Self {
        Self::new(default_msb_bits())
            .with_segment("mem", 0x0000_0000, 0x8000_0000, true)
            .with_segment("io", 0x8000_0000, 0x8000_0000, false)
    }
}

/// Flattened segment table: one cacheable flag per MSB slot
#[derive(Debug, Clone)]
pub struct CacheabilityTable {
    shift: u32,
    mask: u32,
    cached: Vec<bool>,
}

impl CacheabilityTable {
    /// Check whether an address belongs to a cacheable segment
    #[inline(always)]
    pub fn is_cacheable(&self, addr: u32) -> bool {
        self.cached[((addr >> self.shift) & self.mask) as usize]
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcacheConfig {
    /// Instruction cache geometry
    pub icache: CacheGeometry,
    /// Data cache geometry
    pub dcache: CacheGeometry,
    /// Write buffer depth (entries)
    #[serde(default = "default_wbuf_depth")]
    pub wbuf_depth: usize,
    /// Snoop-invalidate coherence enabled
    #[serde(default = "default_snoop")]
    pub snoop: bool,
    /// Cacheability segment table
    #[serde(default)]
    pub segments: SegmentTable,
}

fn default_wbuf_depth() -> usize {
    8
}

fn default_snoop() -> bool {
    true
}

impl Default for XcacheConfig {
    fn default() -> Self {
        Self {
            icache: CacheGeometry::new(4, 64, 8),
            dcache: CacheGeometry::new(4, 64, 8),
            wbuf_depth: default_wbuf_depth(),
            snoop: default_snoop(),
            segments: SegmentTable::default(),
        }
    }
}

impl XcacheConfig {
    /// Validate every parameter
    ///
    /// # Errors
    ///
    /// Returns the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        self.icache.validate("icache")?;
        self.dcache.validate("dcache")?;
        if self.wbuf_depth == 0 {
            return Err(XcacheError::InvalidWriteBufferDepth(self.wbuf_depth));
        }
        self.segments.cached_table()?;
        Ok(())
    }

    /// Parse and validate a TOML configuration
    ///
    /// # Example
    ///
    /// ```
    /// use xcache::core::config::XcacheConfig;
    ///
    /// let config = XcacheConfig::from_toml_str(r#"
    ///     wbuf_depth = 2
    ///     [icache]
    ///     ways = 1
    ///     sets = 16
    ///     words = 4
    ///     [dcache]
    ///     ways = 2
    ///     sets = 4
    ///     words = 4
    /// "#).unwrap();
    /// assert_eq!(config.dcache.ways, 2);
    /// assert!(config.snoop);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| XcacheError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
