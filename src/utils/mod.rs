//! Utility Module
//!
//! - [`time`]: per-tick wall-clock budget
//! - [`version_tracker`]: version counters for published buffers

pub mod time;
pub mod version_tracker;

pub use time::TickBudget;
pub use version_tracker::ChangeTracker;
