//! Animator Settings
//!
//! Runtime configuration for the timeline builder, the evaluator and the tile
//! store. A single [`AnimatorSettings`] value is built once at startup and passed
//! by reference to every component that needs it; nothing here is global.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use timeline4d::config::AnimatorSettings;
//!
//! // Defaults: 20ms tick budget, 0.01s keyframe epsilon
//! let settings = AnimatorSettings::default();
//!
//! // Tighter frame budget for a VR host
//! let settings = AnimatorSettings {
//!     max_update_milliseconds: 4,
//!     ..Default::default()
//! };
//!
//! // Or from a JSON document, missing fields keep their default
//! let settings = AnimatorSettings::from_json(r#"{ "disable_transforms": true }"#)?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animation::tracks::EntryTimeBehavior;
use crate::errors::{Result, TimelineError};

// ---------------------------------------------------------------------------
// MaterialParameters
// ---------------------------------------------------------------------------

/// Names of the material bindings written on every material instance that
/// renders animated or selectable geometry.
///
/// | Field                 | Kind    | Default                         |
/// |-----------------------|---------|---------------------------------|
/// | `selection_buffer`    | buffer  | `PROP_Selection_RGBA`           |
/// | `highlight_buffer`    | buffer  | `PROP_Synchro4D_RGBA`           |
/// | `cutting_plane_buffer`| buffer  | `PROP_Synchro4D_CutPlanes`      |
/// | `forced_alpha`        | scalar  | `PROP_Synchro4D_ForcedAlpha`    |
/// | `feature_id_index`    | scalar  | `_FEATURE_ID_0`                 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialParameters {
    pub selection_buffer: String,
    pub highlight_buffer: String,
    pub cutting_plane_buffer: String,
    /// Opacity override, only meaningful on extracted entities.
    pub forced_alpha: String,
    /// Selects which feature-ID attribute indexes the property buffers.
    pub feature_id_index: String,
}

impl Default for MaterialParameters {
    fn default() -> Self {
        Self {
            selection_buffer: "PROP_Selection_RGBA".to_owned(),
            highlight_buffer: "PROP_Synchro4D_RGBA".to_owned(),
            cutting_plane_buffer: "PROP_Synchro4D_CutPlanes".to_owned(),
            forced_alpha: "PROP_Synchro4D_ForcedAlpha".to_owned(),
            feature_id_index: "_FEATURE_ID_0".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// AnimatorSettings
// ---------------------------------------------------------------------------

/// Global configuration of the animation pipeline.
///
/// # Fields
///
/// | Field                     | Description                                   | Default          |
/// |---------------------------|-----------------------------------------------|------------------|
/// | `keyframe_epsilon`        | Gap separating "instant jump" keyframes (s)   | `0.01`           |
/// | `max_update_milliseconds` | Per-tick evaluation budget                    | `20`             |
/// | `hidden_below_alpha`      | Alpha at or below which an element is hidden  | `0.04`           |
/// | `opaque_above_alpha`      | Alpha at or above which it is fully opaque    | `0.96`           |
/// | `entry_time_behavior`     | Interval owning a query exactly on a keyframe | right interval   |
/// | `selection_color`         | BGRA color of the selected element            | `[96,230,0,255]` |
/// | `hierarchy_max_depth`     | Depth bound of the cycle-detection walk       | `1024`           |
/// | `disable_*`               | Debug switches, one per animated channel      | `false`          |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorSettings {
    // === Timeline Construction ===
    /// Fixed offset, in seconds, used to order keyframes that represent an
    /// instantaneous change and to keep adjacent tasks' boundaries apart.
    pub keyframe_epsilon: f64,

    /// Which side of a keyframe a query at exactly its time belongs to.
    pub entry_time_behavior: EntryTimeBehavior,

    // === Evaluation ===
    /// Wall-clock budget of one evaluation tick. Timelines left over when the
    /// budget runs out are processed on the next tick.
    pub max_update_milliseconds: u64,

    /// Visibility at or below this value hides the element entirely.
    pub hidden_below_alpha: f32,

    /// Visibility below this value (and above `hidden_below_alpha`) needs a
    /// translucent material.
    pub opaque_above_alpha: f32,

    // === Selection ===
    /// Color painted into the selection buffer, in B, G, R, A order.
    pub selection_color: [u8; 4],

    // === Hierarchy ===
    /// Longest parent chain walked before a hierarchy is declared cyclic.
    pub hierarchy_max_depth: usize,

    // === Debug Switches ===
    pub disable_coloring: bool,
    pub disable_visibilities: bool,
    pub disable_cutting_planes: bool,
    pub disable_transforms: bool,

    // === Material Bindings ===
    pub material_parameters: MaterialParameters,
}

impl Default for AnimatorSettings {
    fn default() -> Self {
        Self {
            keyframe_epsilon: 0.01,
            entry_time_behavior: EntryTimeBehavior::UseRightInterval,
            max_update_milliseconds: 20,
            hidden_below_alpha: 0.04,
            opaque_above_alpha: 0.96,
            selection_color: [96, 230, 0, 255],
            hierarchy_max_depth: 1024,
            disable_coloring: false,
            disable_visibilities: false,
            disable_cutting_planes: false,
            disable_transforms: false,
            material_parameters: MaterialParameters::default(),
        }
    }
}

impl AnimatorSettings {
    /// Parses settings from JSON, then [`validate`](Self::validate)s them.
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.keyframe_epsilon.is_finite() && self.keyframe_epsilon > 0.0) {
            return Err(TimelineError::InvalidSetting {
                name: "keyframe_epsilon",
                reason: format!("must be a positive number of seconds, got {}", self.keyframe_epsilon),
            });
        }
        if !(0.0..=1.0).contains(&self.hidden_below_alpha)
            || !(0.0..=1.0).contains(&self.opaque_above_alpha)
            || self.hidden_below_alpha >= self.opaque_above_alpha
        {
            return Err(TimelineError::InvalidSetting {
                name: "hidden_below_alpha",
                reason: format!(
                    "thresholds must satisfy 0 <= hidden ({}) < opaque ({}) <= 1",
                    self.hidden_below_alpha, self.opaque_above_alpha
                ),
            });
        }
        if self.hierarchy_max_depth == 0 {
            return Err(TimelineError::InvalidSetting {
                name: "hierarchy_max_depth",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// The per-tick budget as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.max_update_milliseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_overrides_keep_other_defaults() {
        let s = AnimatorSettings::from_json(r#"{ "max_update_milliseconds": 5 }"#).unwrap();
        assert_eq!(s.max_update_milliseconds, 5);
        assert_eq!(s.keyframe_epsilon, 0.01);
        assert_eq!(s.material_parameters.forced_alpha, "PROP_Synchro4D_ForcedAlpha");
    }

    #[test]
    fn rejects_inverted_alpha_thresholds() {
        let err = AnimatorSettings::from_json(
            r#"{ "hidden_below_alpha": 0.9, "opaque_above_alpha": 0.1 }"#,
        );
        assert!(matches!(err, Err(TimelineError::InvalidSetting { .. })));
    }

    #[test]
    fn rejects_broken_json() {
        assert!(matches!(
            AnimatorSettings::from_json("{ nope"),
            Err(TimelineError::SettingsError(_))
        ));
    }
}
