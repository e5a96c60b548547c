//! Identifier Types
//!
//! Strongly-typed identifiers shared by every component:
//!
//! - [`ElementId`]: arbitrary 64-bit identity of a scene element, as found in
//!   metadata rows (`0x`-prefixed hexadecimal or plain decimal).
//! - [`ElementIndex`]: dense index of an element inside the
//!   [`ElementRegistry`](crate::registry::ElementRegistry) arena.
//! - [`FeatureId`]: small per-tile integer indexing the property buffers.
//! - [`TileId`], [`MaterialId`]: identities supplied by the streaming side.
//! - [`AnimationKey`]: index of an element timeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TimelineError};

/// Stable identity of a scene element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl ElementId {
    /// Parses `0x1a2b`-style hexadecimal or plain decimal identifiers.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16)
        } else {
            trimmed.parse::<u64>()
        };
        parsed
            .map(ElementId)
            .map_err(|_| TimelineError::InvalidIdentifier(text.to_owned()))
    }
}

impl FromStr for ElementId {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Dense index into the element registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementIndex(pub(crate) u32);

impl ElementIndex {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-tile feature index, used as the pixel index of property buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FeatureId(pub u32);

impl FeatureId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a streamed tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

/// Identity of a source material, as reported by the streaming side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u64);

/// Index of an element timeline, recorded on every element the timeline animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationKey(pub u32);

impl AnimationKey {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
