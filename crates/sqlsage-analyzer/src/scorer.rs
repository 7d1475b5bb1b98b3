//! Weighted score deduction

use sqlsage_core::{Finding, ScoreWeights};

/// Turns findings into a 0-100 performance score.
///
/// Starts from 100 and subtracts the configured weight per finding. The
/// result depends only on the multiset of severities, never on order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    pub const MAX_SCORE: u8 = 100;

    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, findings: &[Finding]) -> u8 {
        let penalty: u32 = findings
            .iter()
            .map(|f| u32::from(self.weights.weight_for(f.severity)))
            .sum();
        let remaining = u32::from(Self::MAX_SCORE).saturating_sub(penalty);
        u8::try_from(remaining).unwrap_or(Self::MAX_SCORE)
    }
}
