//! Lifetime weight adaptation.
//!
//! Each neuron carries one [`WeightStrategy`] and applies it to every outgoing
//! connection after a tick, from the post-tick activations of both ends.

use super::gene::WeightStrategy;

/// Weights are kept inside [-WEIGHT_LIMIT, WEIGHT_LIMIT]
pub const WEIGHT_LIMIT: f32 = 1.0;

/// Learning rate used by neurons without their own override
pub const DEFAULT_LEARNING_RATE: f32 = 0.01;

impl WeightStrategy {
    /// New weight for a connection given source/target activations.
    pub fn apply(self, weight: f32, source: f32, target: f32, learning_rate: f32) -> f32 {
        let delta = match self {
            WeightStrategy::AdditiveDifference => source - target,
            WeightStrategy::StrengthBased => source * target,
        };
        let updated = weight + learning_rate * delta;
        if updated.is_finite() {
            updated.clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT)
        } else {
            weight
        }
    }
}
