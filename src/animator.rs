//! Timeline Evaluator
//!
//! The [`Animator`] owns the replay clock and applies timelines to the tiles
//! of a [`SceneMapping`] once per host frame.
//!
//! # Amortized evaluation
//!
//! A pass walks every timeline relevant to the time interval elapsed since the
//! last completed pass, evaluates it and writes the result into the staged
//! property buffers of the tiles rendering its elements. A pass stops as soon
//! as the tick budget (`max_update_milliseconds`) is spent, after at least one
//! timeline, and resumes on the next tick. Buffers are committed only once
//! the whole pass is done, so the rendering side never sees a half-applied
//! pass.
//!
//! # Texel encoding
//!
//! | Channel   | Encoding                                                       |
//! |-----------|----------------------------------------------------------------|
//! | B, G, R   | highlight color, `(0,0,0)` meaning "keep the source color"     |
//! | A         | opacity; 0 masks the feature out (hidden, or extracted)        |
//! | plane     | `[nx, ny, nz, w]`, all zeros meaning "no clipping"             |

use glam::Vec3;

use crate::animation::{AnchorPoint, GrowthStatus, TimelineState, TransformValue};
use crate::bounds::BoundingBox;
use crate::config::AnimatorSettings;
use crate::errors::{Result, TimelineError};
use crate::extraction;
use crate::mapping::SceneMapping;
use crate::registry::Requirements;
use crate::tile::buffer::{ALPHA, PLANE_DISABLED};
use crate::tile::{ElementRank, SceneTile};
use crate::utils::TickBudget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing is applied; buffers hold their neutral values.
    #[default]
    Stopped,
    Paused,
    Playing,
}

/// Packs a highlight color into B, G, R bytes.
///
/// `None` packs to `(0,0,0)`, which the shaders read as "no highlight"; a real
/// color packing to black gets its green channel bumped to 1 so that it stays
/// distinguishable.
#[must_use]
pub fn pack_bgr(color: Option<Vec3>) -> [u8; 3] {
    let Some(color) = color else {
        return [0, 0, 0];
    };
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    let (r, g, b) = (c.x as u8, c.y as u8, c.z as u8);
    if r == 0 && g == 0 && b == 0 {
        [0, 1, 0]
    } else {
        [b, g, r]
    }
}

/// What one timeline asks of its elements at the evaluated time, after the
/// debug switches and thresholds were applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedState {
    /// `None` when the color track is absent or disabled.
    pub color: Option<Option<Vec3>>,
    pub visibility: Option<f32>,
    /// Plane equation to write; `Some(PLANE_DISABLED)` clears clipping.
    pub plane: Option<[f32; 4]>,
    pub transform: Option<TransformValue>,
    pub fully_hidden: bool,
    pub needs_translucency: bool,
    /// Writes alpha even without a visibility track, so that a fully removed
    /// growth can be undone.
    pub drives_alpha: bool,
}

impl AppliedState {
    #[must_use]
    pub fn from_state(state: &TimelineState, settings: &AnimatorSettings) -> Self {
        let color = if settings.disable_coloring { None } else { state.color };
        let visibility = if settings.disable_visibilities {
            None
        } else {
            state.visibility.map(|v| v.clamp(0.0, 1.0))
        };
        let transform = if settings.disable_transforms {
            None
        } else {
            state.transform.filter(|t| t.enabled)
        };
        // Growth is ignored while a 3D path moves the geometry.
        let path_transform = transform.is_some_and(|t| t.anchor != AnchorPoint::Static);
        let plane = if settings.disable_cutting_planes || path_transform {
            None
        } else {
            state.cutting_plane.filter(|p| !p.is_deferred())
        };

        let hidden_by_alpha = visibility.is_some_and(|v| v <= settings.hidden_below_alpha);
        let hidden_by_plane = plane.is_some_and(|p| p.status() == GrowthStatus::FullyRemoved);
        let fully_hidden = hidden_by_alpha || hidden_by_plane;
        let needs_translucency = !fully_hidden && visibility.is_some_and(|v| v < settings.opaque_above_alpha);

        let equation = plane.map(|p| match p.status() {
            GrowthStatus::Partial => p.equation().to_array(),
            GrowthStatus::FullyGrown | GrowthStatus::FullyRemoved => PLANE_DISABLED,
        });

        Self {
            color,
            visibility,
            plane: equation,
            transform,
            fully_hidden,
            needs_translucency,
            drives_alpha: visibility.is_some() || plane.is_some(),
        }
    }

    /// Alpha written in the batch for a non-extracted element.
    #[must_use]
    pub fn batched_alpha(&self, settings: &AnimatorSettings) -> u8 {
        if self.fully_hidden {
            return 0;
        }
        match self.visibility {
            Some(v) if v < settings.opaque_above_alpha => (v * 255.0).round() as u8,
            _ => 255,
        }
    }
}

/// Replay clock and per-tick evaluation.
#[derive(Debug)]
pub struct Animator {
    state: PlaybackState,
    time: f64,
    replay_speed: f64,
    /// Time of the last completed pass.
    last_applied: Option<f64>,
    /// Time the pass in progress evaluates.
    pass_time: f64,
    /// Index of the next timeline of the pass in progress.
    next_timeline: usize,
    pass_in_progress: bool,
    full_update: bool,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Stopped,
            time: 0.0,
            replay_speed: 1.0,
            last_applied: None,
            pass_time: 0.0,
            next_timeline: 0,
            pass_in_progress: false,
            full_update: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn replay_speed(&self) -> f64 {
        self.replay_speed
    }

    /// Whether a pass started on an earlier tick is still unfinished.
    #[inline]
    #[must_use]
    pub fn is_pass_in_progress(&self) -> bool {
        self.pass_in_progress
    }

    // ========================================================================
    // Control surface
    // ========================================================================

    /// Starts or resumes replay. From the stopped state, or at the end of the
    /// schedule, replay restarts from the schedule start.
    pub fn play(&mut self, scene: &SceneMapping) {
        let range = scene.schedule_range();
        let at_end = range.is_some_and(|(start, end)| {
            if self.replay_speed > 0.0 { self.time >= end } else { self.time <= start }
        });
        if (self.state == PlaybackState::Stopped || at_end)
            && let Some((start, end)) = range
        {
            self.time = if self.replay_speed > 0.0 { start } else { end };
            self.request_full_update();
        }
        self.state = PlaybackState::Playing;
        log::info!("Replay started at {}", self.time);
    }

    /// Freezes replay; buffers keep their last computed values.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            log::info!("Replay paused at {}", self.time);
        }
    }

    /// Stops replay and brings every tile back to its neutral look.
    pub fn stop(&mut self, scene: &mut SceneMapping) {
        for (_, tile) in scene.tiles.iter_mut() {
            if !tile.is_loaded() {
                continue;
            }
            tile.reset_animation();
            tile.commit();
        }
        self.state = PlaybackState::Stopped;
        self.pass_in_progress = false;
        self.next_timeline = 0;
        self.last_applied = None;
        self.full_update = true;
        log::info!("Replay stopped");
    }

    /// Jumps to `time`. From the stopped state, replay becomes paused so that
    /// the new time gets applied.
    pub fn set_time(&mut self, time: f64) -> Result<()> {
        if !time.is_finite() {
            return Err(TimelineError::InvalidTimeRange { start: time, end: time });
        }
        if time < self.time {
            self.request_full_update();
        }
        self.time = time;
        if self.state == PlaybackState::Stopped {
            self.state = PlaybackState::Paused;
        }
        Ok(())
    }

    /// Ratio of schedule seconds per host second; negative replays backwards.
    pub fn set_replay_speed(&mut self, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed == 0.0 {
            return Err(TimelineError::InvalidReplaySpeed(speed));
        }
        self.replay_speed = speed;
        Ok(())
    }

    fn request_full_update(&mut self) {
        self.full_update = true;
        self.pass_in_progress = false;
        self.next_timeline = 0;
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advances the clock by `delta` host seconds and applies timelines within
    /// the tick budget. Returns `true` when a pass completed and its buffers
    /// were committed during this tick.
    pub fn tick(&mut self, scene: &mut SceneMapping, delta: f64) -> bool {
        if self.state == PlaybackState::Stopped {
            return false;
        }
        if self.state == PlaybackState::Playing && delta.is_finite() {
            self.advance(scene, delta);
        }
        if scene.take_full_update_request() {
            self.request_full_update();
        }
        let done = self.update(scene);
        for (_, tile) in scene.tiles.iter_mut() {
            if tile.is_loaded() {
                tile.setup_materials(&scene.settings.material_parameters);
            }
        }
        done
    }

    fn advance(&mut self, scene: &SceneMapping, delta: f64) {
        self.time += delta * self.replay_speed;
        let Some((start, end)) = scene.schedule_range() else {
            return;
        };
        let reached = if self.replay_speed > 0.0 {
            (self.time >= end).then_some(end)
        } else {
            (self.time <= start).then_some(start)
        };
        if let Some(bound) = reached {
            self.time = bound;
            self.state = PlaybackState::Paused;
            log::info!("End of schedule reached at {bound}, replay paused");
        }
    }

    /// Runs (or resumes) a pass. Returns `true` if it completed.
    fn update(&mut self, scene: &mut SceneMapping) -> bool {
        if !self.pass_in_progress {
            let nothing_to_do = !self.full_update
                && self.last_applied == Some(self.time)
                && !scene.timelines.iter().any(|t| t.is_modified());
            if nothing_to_do {
                return false;
            }
            self.pass_in_progress = true;
            self.next_timeline = 0;
            self.pass_time = self.time;
            if self.full_update {
                hide_non_animated_duplicates(scene);
            }
        }

        let budget = TickBudget::start(scene.settings.tick_budget());
        let (lo, hi) = match self.last_applied {
            Some(last) => (last.min(self.pass_time), last.max(self.pass_time)),
            None => (self.pass_time, self.pass_time),
        };
        let full = self.full_update || self.last_applied.is_none();
        let count = scene.timelines.len();
        let mut processed = 0usize;
        while self.next_timeline < count {
            let index = self.next_timeline;
            self.next_timeline += 1;
            let relevant = {
                let timeline = &scene.timelines[index];
                full || timeline.is_modified() || timeline.time_range().is_some_and(|(a, b)| a <= hi && b >= lo)
            };
            if !relevant {
                continue;
            }
            apply_timeline(scene, index, self.pass_time);
            processed += 1;
            if self.next_timeline < count && budget.is_exhausted() {
                log::trace!(
                    "Tick budget spent after {processed} timeline(s) ({:?}), resuming at {}/{count}",
                    budget.elapsed(),
                    self.next_timeline
                );
                return false;
            }
        }

        for (_, tile) in scene.tiles.iter_mut() {
            if tile.is_loaded() {
                tile.commit();
            }
        }
        self.last_applied = Some(self.pass_time);
        self.pass_in_progress = false;
        self.next_timeline = 0;
        self.full_update = false;
        true
    }
}

// ============================================================================
// Application
// ============================================================================

fn hide_non_animated_duplicates(scene: &mut SceneMapping) {
    let ids: Vec<_> = scene
        .duplicates
        .non_animated()
        .filter_map(|i| scene.registry.get(i).map(|e| e.id))
        .collect();
    for id in ids {
        for key in scene.tiles.tiles_of(id).to_vec() {
            let Some(tile) = scene.tiles.get_mut(key) else {
                continue;
            };
            let Some(rank) = tile.rank_of(id) else {
                continue;
            };
            tile.ensure_highlights();
            let features = tile.element(rank).map(|r| r.features.clone()).unwrap_or_default();
            if let Some(buf) = &mut tile.highlights {
                buf.set_pixels_channel(&features, ALPHA, 0);
            }
        }
    }
}

fn apply_timeline(scene: &mut SceneMapping, index: usize, time: f64) {
    let SceneMapping {
        settings,
        registry,
        tiles,
        timelines,
        ..
    } = scene;
    let Some(timeline) = timelines.get_mut(index) else {
        return;
    };
    timeline.take_modified();
    if timeline.group_box().is_none() {
        let bbox = registry.group_bounding_box(timeline.elements());
        if timeline.finalize_deferred(bbox) {
            log::trace!("Timeline {:?} anchored on {:?}", timeline.key(), bbox);
        }
    }
    let state = timeline.state_at(time, settings.entry_time_behavior);
    let applied = AppliedState::from_state(&state, settings);
    let group_box = timeline.group_box().copied().unwrap_or(BoundingBox::EMPTY);

    for &element in timeline.elements() {
        let Some(scene_element) = registry.get(element) else {
            continue;
        };
        let (id, requirements) = (scene_element.id, scene_element.requirements);
        let mut wanted = Requirements::empty();
        if applied.needs_translucency {
            wanted |= Requirements::TRANSLUCENT;
        }
        if applied.transform.is_some() {
            wanted |= Requirements::TRANSFORMABLE;
        }

        for key in tiles.tiles_of(id).to_vec() {
            let Some(tile) = tiles.get_mut(key) else {
                continue;
            };
            let Some(rank) = tile.rank_of(id) else {
                continue;
            };
            tile.ensure_buffers(requirements);
            if !wanted.is_empty() {
                // Extract with every capability the element will ever need, so
                // that its material is chosen once. A future transform keyframe
                // thus splits the element out of an all-translucent tile early.
                extraction::check_and_extract_in_tile(
                    tile,
                    id,
                    requirements | wanted,
                    &settings.material_parameters,
                );
            }
            update_batched_element(tile, rank, &applied, settings);
            update_extracted_element(tile, rank, &applied, &group_box, settings);
        }
    }
}

fn update_batched_element(tile: &mut SceneTile, rank: ElementRank, applied: &AppliedState, settings: &AnimatorSettings) {
    let Some(rec) = tile.element(rank) else {
        return;
    };
    let extracted = rec.is_extracted();
    let features = rec.features.clone();

    if let Some(buf) = &mut tile.highlights {
        let [b, g, r] = pack_bgr(applied.color.flatten());
        let alpha = if extracted { 0 } else { applied.batched_alpha(settings) };
        let write_alpha = applied.drives_alpha || extracted;
        buf.set_pixels_masked(
            &features,
            [b, g, r, alpha],
            [applied.color.is_some(), applied.color.is_some(), applied.color.is_some(), write_alpha],
        );
    }
    if let (Some(buf), Some(plane)) = (&mut tile.cutting_planes, applied.plane) {
        buf.set_pixels(&features, plane);
    }
}

fn update_extracted_element(
    tile: &mut SceneTile,
    rank: ElementRank,
    applied: &AppliedState,
    group_box: &BoundingBox,
    settings: &AnimatorSettings,
) {
    let Some(extracted_rank) = tile.element(rank).and_then(|r| r.extracted_rank()) else {
        return;
    };
    let SceneTile { extracted, materials, .. } = tile;
    let Some(element) = extracted.get_mut(extracted_rank) else {
        return;
    };
    let forced_alpha = applied.visibility.unwrap_or(1.0);
    let offset = applied.transform.map(|t| t.to_affine(group_box));
    for entity in &mut element.entities {
        entity.hidden = applied.fully_hidden;
        entity.forced_alpha = forced_alpha;
        if let Some(material) = materials.get_mut(entity.material) {
            material.set_scalar(&settings.material_parameters.forced_alpha, forced_alpha);
        }
        match offset {
            Some(offset) => {
                entity.world_transform = offset * entity.original_transform;
                entity.currently_transformed = true;
            }
            None if entity.currently_transformed => {
                entity.world_transform = entity.original_transform;
                entity.currently_transformed = false;
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::PlaneValue;

    #[test]
    fn black_stays_distinguishable_from_no_color() {
        assert_eq!(pack_bgr(None), [0, 0, 0]);
        assert_eq!(pack_bgr(Some(Vec3::ZERO)), [0, 1, 0]);
        assert_eq!(pack_bgr(Some(Vec3::new(1.0, 0.5, 0.0))), [0, 128, 255]);
    }

    #[test]
    fn removed_growth_hides_even_when_opaque() {
        let settings = AnimatorSettings::default();
        let state = TimelineState {
            visibility: Some(1.0),
            cutting_plane: Some(PlaneValue::Resolved {
                normal: Vec3::Z,
                w: 0.0,
                status: GrowthStatus::FullyRemoved,
            }),
            ..Default::default()
        };
        let applied = AppliedState::from_state(&state, &settings);
        assert!(applied.fully_hidden);
        assert_eq!(applied.plane, Some(PLANE_DISABLED));
        assert_eq!(applied.batched_alpha(&settings), 0);
    }
}
