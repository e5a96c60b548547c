use rustc_hash::FxHashMap;
use slotmap::new_key_type;

use crate::ids::MaterialId;

new_key_type! {
    /// Handle of a material instance inside its tile.
    pub struct MaterialKey;
}

/// Which tile buffer a material binding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferChannel {
    Highlight,
    CuttingPlane,
    Selection,
}

/// Blending of the base material an instance derives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    Masked,
    Translucent,
}

/// Parameters this crate sets on one material instance. The rendering side
/// owns the actual GPU material and mirrors these bindings onto it.
#[derive(Debug, Clone, Default)]
pub struct MaterialInstance {
    pub source: Option<MaterialId>,
    pub blend: BlendMode,
    buffers: FxHashMap<String, BufferChannel>,
    scalars: FxHashMap<String, f32>,
}

impl MaterialInstance {
    #[must_use]
    pub fn new(source: Option<MaterialId>, blend: BlendMode) -> Self {
        Self {
            source,
            blend,
            buffers: FxHashMap::default(),
            scalars: FxHashMap::default(),
        }
    }

    pub fn bind_buffer(&mut self, parameter: &str, channel: BufferChannel) {
        self.buffers.insert(parameter.to_owned(), channel);
    }

    #[must_use]
    pub fn buffer(&self, parameter: &str) -> Option<BufferChannel> {
        self.buffers.get(parameter).copied()
    }

    pub fn set_scalar(&mut self, parameter: &str, value: f32) {
        self.scalars.insert(parameter.to_owned(), value);
    }

    #[must_use]
    pub fn scalar(&self, parameter: &str) -> Option<f32> {
        self.scalars.get(parameter).copied()
    }

    pub fn bound_buffers(&self) -> impl Iterator<Item = (&str, BufferChannel)> {
        self.buffers.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[inline]
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        self.blend == BlendMode::Translucent
    }
}
