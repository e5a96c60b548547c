//! Element Registry
//!
//! The canonical table of scene elements: identity, parent/child hierarchy,
//! duplicate groups, accumulated bounding boxes and the cumulative
//! [`Requirements`] their animations place on the tiles rendering them.
//!
//! # Hierarchy safety
//!
//! Parent links come from external metadata and may contain loops. Ingesting a
//! batch never fails because of that: the batch's links are discarded, a
//! warning is logged and the affected elements stay parent-less.
//!
//! ```rust,ignore
//! let (report, outcome) = registry.ingest_parent_rows(&rows, settings.hierarchy_max_depth);
//! if outcome == HierarchyOutcome::CycleDetected {
//!     // hierarchy is flat for this batch
//! }
//! ```

pub mod element;
pub mod metadata;
pub mod registry;

pub use element::{Requirements, SceneElement};
pub use metadata::RowReport;
pub use registry::{ElementRegistry, HierarchyOutcome};
