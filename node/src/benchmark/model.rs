//! Model artifacts, constructed from a file's suffix.
//!
//! Maps a few known artifact extensions to loader types and refuses
//! anything else.

use std::path::{Path, PathBuf};

/// A concrete model artifact on disk.
///
/// This crate never loads or trains the artifact itself, that is
/// `Benchmark`'s job. `Model` exists only to carry the artifact's path
/// (and framework tag) across the `MineTask` pipeline and into
/// `Benchmark::mine`/`evaluate`.
pub trait Model: Send + Sync {
    fn path(&self) -> &Path;
}

/// A PyTorch-format checkpoint (`.pt`/`.pth`).
pub struct TorchModel {
    path: PathBuf,
}

impl TorchModel {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Model for TorchModel {
    fn path(&self) -> &Path {
        &self.path
    }
}

/// Builds a concrete [`Model`] from `path`'s extension.
///
/// Returns `None` for any suffix not in the known registry, so the
/// pipeline aborts cleanly rather than guessing a loader.
pub fn model_from_path(path: PathBuf) -> Option<Box<dyn Model>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("pt") | Some("pth") => Some(Box::new(TorchModel::new(path))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_suffixes_produce_a_model() {
        assert!(model_from_path(PathBuf::from("weights.pt")).is_some());
        assert!(model_from_path(PathBuf::from("weights.pth")).is_some());
    }

    #[test]
    fn unknown_suffix_yields_none() {
        assert!(model_from_path(PathBuf::from("weights.onnx")).is_none());
        assert!(model_from_path(PathBuf::from("weights")).is_none());
    }
}
