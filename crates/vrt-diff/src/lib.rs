//! # vrt-diff
//!
//! Pixel-level comparison of baseline and post-fix snapshots.
//!
//! Analysis runs in stages: decode both screenshots, walk the rasters
//! collecting pixels past the color threshold, flood-fill those pixels into
//! connected regions, then classify each region by type and severity. The
//! [`DiffEngine`] wraps the pipeline with authorization, auditing, and
//! persistence.

pub mod classify;
mod engine;
pub mod pixel;
pub mod region;
mod types;

pub use engine::{DiffEngine, DiffStatistics};
pub use types::{DiffRegion, DiffResult, DiffRunMetadata, DiffSeverity, DiffSummary, DiffType};
