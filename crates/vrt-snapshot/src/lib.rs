//! # vrt-snapshot
//!
//! Snapshot capture and retention for the VRT pipeline.
//!
//! A snapshot is a visual+structural record of one UI component at one
//! simulated viewport, tagged as `baseline` or `post-fix`. The store owns
//! snapshot lifetime: records are immutable once captured and removed only
//! by retention cleanup. Capture itself is an injected capability; this
//! crate handles authorization, metadata assembly, persistence, and audit.

pub mod record;
pub mod store;

pub use record::{CaptureKind, ComponentStateSnapshot, SnapshotMetadata, SnapshotRecord};
pub use store::{ComparisonPair, SnapshotStore, StorageStats};
