//! Reference to a content-addressed model artifact.

use serde::{Deserialize, Serialize};

/// Identifies a model artifact by its content hash and a swarm locator
/// that can resolve the hash to bytes.
///
/// Identity is `model_hash` alone: two `ModelRef`s naming the same bytes
/// are the same model reference even if `magnet_link` differs (e.g. a
/// newer, more seeded tracker list for the same content).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelRef {
    pub model_hash: String,
    pub magnet_link: String,
}

impl ModelRef {
    pub fn new(model_hash: impl Into<String>, magnet_link: impl Into<String>) -> Self {
        Self {
            model_hash: model_hash.into(),
            magnet_link: magnet_link.into(),
        }
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.model_hash == other.model_hash
    }
}

impl Eq for ModelRef {}
