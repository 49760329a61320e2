//! # vrt-confidence
//!
//! Turns diff evidence into a signed confidence adjustment for the agent
//! that produced a fix. A small learning model (multiplier plus two moving
//! averages) persists across adjustments and damps or amplifies future
//! factors based on how stable layouts have been historically.

mod adjuster;
mod model;

pub use adjuster::{
    ConfidenceAdjuster, ConfidenceAdjustment, ConfidenceStatistics, VisualFactors,
};
pub use model::LearningModel;
