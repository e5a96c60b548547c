//! Tile Store
//!
//! Per-tile state connecting streamed batched geometry to element animation.
//!
//! # Overview
//!
//! Each [`SceneTile`] maps the elements it renders to their feature indices,
//! fragments and material instances, and owns up to three feature-indexed
//! property buffers:
//!
//! | Buffer        | Texel      | Neutral value  |
//! |---------------|------------|----------------|
//! | highlight     | BGRA8      | `[0,0,0,255]`  |
//! | cutting plane | RGBA32F    | `[0,0,0,0]`    |
//! | selection     | BGRA8      | `[0,0,0,255]`  |
//!
//! Buffers are created the first time an element of the tile needs them and
//! attached to material instances only once the rendering side reports them
//! ready (see [`SceneTile::setup_materials`]).

pub mod buffer;
pub mod content;
pub mod features;
pub mod material;
pub mod store;
#[allow(clippy::module_inception)]
pub mod tile;

pub use buffer::{Bgra8Buffer, PlaneBuffer, PropertyBuffer};
pub use content::{FeatureMapping, MeshContent, TileContent};
pub use features::{ElementInTile, ExtractedElement, ExtractedEntity, MeshFragment, TextureSetup};
pub use material::{BlendMode, BufferChannel, MaterialInstance, MaterialKey};
pub use store::{TileKey, TileStore};
pub use tile::{BufferNeeds, ElementRank, SceneTile};
