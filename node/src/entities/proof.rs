//! Proof: evidence that a model beats the prior recorded completion.

use serde::{Deserialize, Serialize};

use crate::entities::MAX_STRING_LENGTH;
use crate::entities::model_ref::ModelRef;

/// Rounds `score` to 4 decimal places, half away from zero.
///
/// Half-away-from-zero rather than half-to-even (see `DESIGN.md`,
/// "completion rounding"). What matters for consensus is that every node
/// rounds the same way, not which convention is chosen.
pub fn round_completion(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

/// The block-bound evidence that a model beats the prior recorded
/// completion on a named benchmark.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    pub completion: f64,
    pub benchmark_id: String,
    pub citation: String,
    pub license: String,
    pub message: String,
    pub model: ModelRef,
}

impl Proof {
    pub fn new(
        completion: f64,
        benchmark_id: impl Into<String>,
        citation: impl Into<String>,
        license: impl Into<String>,
        message: impl Into<String>,
        model: ModelRef,
    ) -> Self {
        Self {
            completion: round_completion(completion),
            benchmark_id: benchmark_id.into(),
            citation: citation.into(),
            license: license.into(),
            message: message.into(),
            model,
        }
    }

    /// Structural validity: bounded string fields and a completion value
    /// that is already in rounded form. Benchmark-id registry membership
    /// and the score re-evaluation itself are the chain's job, not the
    /// proof's, see `chain::Chain::verify_block`.
    pub fn valid(&self) -> bool {
        self.citation.len() < MAX_STRING_LENGTH
            && self.license.len() < MAX_STRING_LENGTH
            && self.message.len() < MAX_STRING_LENGTH
            && !self.benchmark_id.is_empty()
            && self.completion == round_completion(self.completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_is_rounded_on_construction() {
        let proof = Proof::new(
            94.243_7891,
            "mnist",
            "",
            "",
            "",
            ModelRef::new("h", "m"),
        );
        assert_eq!(proof.completion, 94.2438);
        assert!(proof.valid());
    }

    #[test]
    fn oversized_message_is_invalid() {
        let proof = Proof::new(1.0, "mnist", "", "", "x".repeat(1024), ModelRef::new("h", "m"));
        assert!(!proof.valid());
    }
}
