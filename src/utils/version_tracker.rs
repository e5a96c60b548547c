/// Version counter of a piece of published data.
///
/// Each publication bumps the version, so consumers holding the last version
/// they uploaded can tell whether they are stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Marks as modified, increments version by 1
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether data published at `seen` is older than the current version.
    #[inline]
    #[must_use]
    pub fn is_newer_than(&self, seen: u64) -> bool {
        self.version != seen
    }
}
