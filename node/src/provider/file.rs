//! Local-filesystem content-addressed store.
//!
//! Layout: `<cache>/<sha256hex>/<original-filename>`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::{Node, Provider, ProviderError};

pub(crate) fn hash_of_file(path: &Path) -> Result<String, ProviderError> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(bytes)))
}

/// Finds the file under `<folder>/<hash>/` whose content actually hashes
/// to `hash`, guarding against a corrupted or tampered cache entry.
pub(crate) fn file_for_hash(hash: &str, folder: &Path) -> Option<PathBuf> {
    let sub_folder = folder.join(hash);
    if !sub_folder.is_dir() {
        return None;
    }
    for entry in fs::read_dir(&sub_folder).ok()?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if hash_of_file(&path).ok().as_deref() == Some(hash) {
            return Some(path);
        }
    }
    None
}

/// Provider backed by a cache directory on the local filesystem.
pub struct FileProvider {
    cache_folder: PathBuf,
}

impl FileProvider {
    pub fn new(cache_folder: impl Into<PathBuf>) -> Self {
        Self {
            cache_folder: cache_folder.into(),
        }
    }
}

impl Provider for FileProvider {
    fn path(
        &self,
        hash: &str,
        _link: Option<&str>,
        _skip_check: bool,
    ) -> Result<Option<PathBuf>, ProviderError> {
        Ok(file_for_hash(hash, &self.cache_folder))
    }

    /// Already local; nothing to distribute.
    fn distribute(&self, _hash: &str) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }

    fn write(&self, name: &str, content: &[u8]) -> Result<Option<String>, ProviderError> {
        let hash = hex::encode(Sha256::digest(content));
        let sub_folder = self.cache_folder.join(&hash);
        fs::create_dir_all(&sub_folder)?;
        fs::write(sub_folder.join(name), content)?;
        Ok(Some(hash))
    }

    fn copy(&self, path: &Path) -> Result<Option<PathBuf>, ProviderError> {
        let hash = hash_of_file(path)?;
        let sub_folder = self.cache_folder.join(&hash);
        fs::create_dir_all(&sub_folder)?;
        let file_name = path
            .file_name()
            .ok_or_else(|| ProviderError::Io(std::io::Error::other("path has no file name")))?;
        let new_path = sub_folder.join(file_name);
        fs::copy(path, &new_path)?;
        Ok(Some(new_path))
    }

    fn nodes(&self, _port: u16) -> HashSet<Node> {
        HashSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_then_path_round_trips_content() {
        let dir = TempDir::new().unwrap();
        let provider = FileProvider::new(dir.path());

        let hash = provider.write("x", b"hello").unwrap().unwrap();
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );

        let path = provider.path(&hash, None, false).unwrap().unwrap();
        let bytes = fs::read(path).unwrap();
        assert_eq!(hex::encode(Sha256::digest(bytes)), hash);
    }

    #[test]
    fn path_misses_for_unknown_hash() {
        let dir = TempDir::new().unwrap();
        let provider = FileProvider::new(dir.path());
        assert!(provider.path("deadbeef", None, false).unwrap().is_none());
    }

    #[test]
    fn copy_imports_external_file_under_its_hash() {
        let dir = TempDir::new().unwrap();
        let src_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("model.pt");
        fs::write(&src, b"weights").unwrap();

        let provider = FileProvider::new(dir.path());
        let new_path = provider.copy(&src).unwrap().unwrap();
        assert_eq!(fs::read(new_path).unwrap(), b"weights");
    }
}
