use glam::Vec3;

/// What a task does to the elements it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileAction {
    /// Elements appear: hidden before the task.
    #[default]
    Install,
    /// Elements disappear: hidden after the task.
    Remove,
    /// Elements exist before and after the task.
    Maintenance,
    /// Elements only exist during the task.
    Temporary,
    /// Elements are hidden for the whole task.
    Neutral,
}

/// Look of an element at one point of a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    /// Linear RGB in [0, 1].
    pub color: Vec3,
    pub use_original_color: bool,
    pub alpha: f32,
    pub use_original_alpha: bool,
}

impl Default for Appearance {
    fn default() -> Self {
        Self::ORIGINAL
    }
}

impl Appearance {
    /// Keep both the source color and the source opacity.
    pub const ORIGINAL: Self = Self {
        color: Vec3::ONE,
        use_original_color: true,
        alpha: 1.0,
        use_original_alpha: true,
    };

    #[must_use]
    pub fn colored(color: Vec3, alpha: f32) -> Self {
        Self {
            color,
            use_original_color: false,
            alpha,
            use_original_alpha: false,
        }
    }

    #[must_use]
    pub fn with_alpha(alpha: f32) -> Self {
        Self {
            alpha,
            use_original_alpha: false,
            ..Self::ORIGINAL
        }
    }

    #[inline]
    #[must_use]
    pub fn color_value(&self) -> Option<Vec3> {
        (!self.use_original_color).then_some(self.color)
    }

    /// Opacity, where "original" means fully opaque.
    #[inline]
    #[must_use]
    pub fn alpha_value(&self) -> f32 {
        if self.use_original_alpha { 1.0 } else { self.alpha }
    }
}

/// Direction along which growth simulation reveals or hides an element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GrowthMode {
    #[default]
    None,
    Unknown,
    Bottom2Top,
    Top2Bottom,
    Left2Right,
    Right2Left,
    Back2Front,
    Front2Back,
    /// Explicit direction, need not be normalized.
    Custom(Vec3),
}

impl GrowthMode {
    #[inline]
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        !matches!(self, Self::None | Self::Unknown)
    }

    /// Unit normal of the cutting plane, pointing into the clipped half-space.
    /// `None` for non-simulated modes and degenerate custom directions.
    #[must_use]
    pub fn plane_normal(&self) -> Option<Vec3> {
        match *self {
            Self::None | Self::Unknown => None,
            Self::Bottom2Top => Some(Vec3::Z),
            Self::Top2Bottom => Some(-Vec3::Z),
            Self::Left2Right => Some(Vec3::X),
            Self::Right2Left => Some(-Vec3::X),
            Self::Back2Front => Some(Vec3::Y),
            Self::Front2Back => Some(-Vec3::Y),
            Self::Custom(dir) => dir.try_normalize(),
        }
    }
}

/// Appearance during the task: interpolates opacity from `base.alpha` to
/// `finish_alpha` and may simulate growth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActiveAppearance {
    pub base: Appearance,
    pub finish_alpha: f32,
    pub growth: GrowthMode,
    /// "Simulate as remove": only honored for Maintenance and Temporary tasks.
    pub invert_growth: bool,
}

impl ActiveAppearance {
    #[inline]
    #[must_use]
    pub fn start_alpha(&self) -> f32 {
        self.base.alpha_value()
    }

    #[inline]
    #[must_use]
    pub fn end_alpha(&self) -> f32 {
        if self.base.use_original_alpha { 1.0 } else { self.finish_alpha }
    }
}

/// How elements look before, during and after a task.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AppearanceProfile {
    pub action: ProfileAction,
    pub start: Appearance,
    pub active: ActiveAppearance,
    pub finish: Appearance,
}

impl AppearanceProfile {
    /// Profile keeping every source value, for `action`.
    #[must_use]
    pub fn original(action: ProfileAction) -> Self {
        Self {
            action,
            start: Appearance::ORIGINAL,
            active: ActiveAppearance {
                base: Appearance::ORIGINAL,
                finish_alpha: 1.0,
                growth: GrowthMode::None,
                invert_growth: false,
            },
            finish: Appearance::ORIGINAL,
        }
    }
}
