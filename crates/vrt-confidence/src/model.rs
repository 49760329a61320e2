//! Persistent learning state
//!
//! Three scalars carried across adjustments. `visual_multiplier` scales the
//! raw adjustment factor and drifts toward 1.1 when layouts stay stable and
//! toward 0.9 when they do not. The other two are exponential moving
//! averages used for reporting and factor damping.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningModel {
    /// Multiplier on the raw adjustment factor, clamped to [0.5, 1.5]
    pub visual_multiplier: f64,
    /// EMA of a binary "did confidence increase" signal
    pub historical_accuracy: f64,
    /// EMA of observed layout stability
    pub visual_consistency: f64,
}

impl Default for LearningModel {
    fn default() -> Self {
        Self {
            visual_multiplier: 1.0,
            historical_accuracy: 0.5,
            visual_consistency: 0.5,
        }
    }
}

impl LearningModel {
    /// Fold one adjustment outcome into the model
    pub fn observe(&mut self, layout_stability: f64, confidence_increased: bool) {
        self.visual_multiplier =
            (self.visual_multiplier * (0.9 + layout_stability * 0.2)).clamp(0.5, 1.5);

        let accuracy = if confidence_increased { 1.0 } else { 0.0 };
        self.historical_accuracy = self.historical_accuracy * 0.9 + accuracy * 0.1;
        self.visual_consistency = self.visual_consistency * 0.9 + layout_stability * 0.1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_layouts_raise_the_multiplier() {
        let mut model = LearningModel::default();
        model.observe(1.0, true);
        assert!((model.visual_multiplier - 1.1).abs() < 1e-9);
        assert!((model.historical_accuracy - 0.55).abs() < 1e-9);
        assert!((model.visual_consistency - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_unstable_layouts_lower_the_multiplier() {
        let mut model = LearningModel::default();
        model.observe(0.0, false);
        assert!((model.visual_multiplier - 0.9).abs() < 1e-9);
        assert!((model.historical_accuracy - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_stays_bounded() {
        let mut model = LearningModel::default();
        for _ in 0..100 {
            model.observe(1.0, true);
        }
        assert!(model.visual_multiplier <= 1.5);

        for _ in 0..100 {
            model.observe(0.0, false);
        }
        assert!(model.visual_multiplier >= 0.5);
        assert!(model.historical_accuracy >= 0.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut model = LearningModel::default();
        model.observe(1.0, true);
        model.reset();
        assert_eq!(model, LearningModel::default());
    }
}
