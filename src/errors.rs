//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`TimelineError`] covers the failure modes of the public
//! entry points:
//! - Lookups of unknown elements, tiles or timelines on the control surface
//! - Malformed metadata rows (parent links, source identities)
//! - Invalid schedule input (inverted time ranges, non-finite values)
//! - Configuration parsing
//!
//! Conditions the animation pipeline is expected to survive (hierarchy cycles,
//! undersized property buffers, missing geometry during extraction, degenerate
//! 3D paths) are handled in place and logged; they never surface as errors.
//!
//! # Usage
//!
//! ```rust,ignore
//! use timeline4d::errors::{TimelineError, Result};
//!
//! fn bind() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::ids::{ElementId, TileId};

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum TimelineError {
    // ========================================================================
    // Registry & Hierarchy Errors
    // ========================================================================
    /// The element was never registered.
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    /// Linking `child` under `parent` would close a loop in the hierarchy.
    #[error("Parent link {child} -> {parent} would create a hierarchy cycle")]
    HierarchyCycle {
        /// Element being re-parented
        child: ElementId,
        /// Requested parent
        parent: ElementId,
    },

    // ========================================================================
    // Metadata Row Errors
    // ========================================================================
    /// A metadata row did not have the expected number of fields.
    #[error("Malformed metadata row: expected {expected} fields, found {found}")]
    MalformedRow {
        /// Number of fields the row kind requires
        expected: usize,
        /// Number of fields actually present
        found: usize,
    },

    /// An element identifier could not be parsed.
    #[error("Invalid element identifier: {0:?}")]
    InvalidIdentifier(String),

    // ========================================================================
    // Tile Errors
    // ========================================================================
    /// The tile was never reported by the streaming side.
    #[error("Unknown tile: {0}")]
    UnknownTile(TileId),

    /// A feature index referenced by a tile is past its declared maximum.
    #[error("Feature index {feature} out of range for tile {tile} (max {max})")]
    FeatureOutOfRange {
        /// Tile being built
        tile: TileId,
        /// Offending feature index
        feature: u32,
        /// Declared maximum feature index
        max: u32,
    },

    // ========================================================================
    // Schedule Input Errors
    // ========================================================================
    /// Task time range ends before it starts, or is not finite.
    #[error("Invalid task time range [{start}, {end}]")]
    InvalidTimeRange {
        /// Range start, in seconds
        start: f64,
        /// Range end, in seconds
        end: f64,
    },

    /// A binding named no element at all.
    #[error("Animation binding has no target element")]
    EmptyBinding,

    /// A 3D path keyframe is outside the [0, 1] relative time range.
    #[error("3D path keyframe at relative time {0} is outside [0, 1]")]
    InvalidPathKeyframe(f64),

    /// Replay speed must be a finite, non-zero ratio.
    #[error("Invalid replay speed: {0}")]
    InvalidReplaySpeed(f64),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings JSON could not be parsed.
    #[error("Settings parse error: {0}")]
    SettingsError(#[from] serde_json::Error),

    /// A settings value is outside its valid domain.
    #[error("Invalid setting `{name}`: {reason}")]
    InvalidSetting {
        /// Name of the offending field
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Alias for `Result<T, TimelineError>`.
pub type Result<T> = std::result::Result<T, TimelineError>;
