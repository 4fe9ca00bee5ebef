//! Swarm-backed content distribution.
//!
//! The swarm download/seed layer is kept behind a narrow [`SwarmSession`]
//! contract rather than a concrete BitTorrent dependency. The one concrete
//! implementation here, [`NoopSwarmSession`], is a deterministic local
//! stand-in used in tests and single-node runs; a production deployment
//! would implement `SwarmSession` against a real BitTorrent library.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::file::{file_for_hash, hash_of_file};
use super::{Node, Provider, ProviderError};

/// Narrow contract over an external swarm session.
pub trait SwarmSession: Send + Sync {
    /// Blocks until `link`'s metadata and content are available, returning
    /// the downloaded file's path.
    fn fetch_by_hash(&self, link: &str) -> Result<PathBuf, ProviderError>;

    /// Seeds `path`, returning a magnet-style locator. Must be idempotent
    /// for the same underlying content.
    fn seed(&self, path: &Path) -> Result<String, ProviderError>;

    /// Connected swarm peers willing to advertise on `port`.
    fn peers(&self, port: u16) -> HashSet<Node>;
}

/// A [`SwarmSession`] with no real network behind it.
///
/// Useful for single-node runs and tests: every seed request is satisfied
/// by a deterministic link derived from the content hash, and fetches
/// always miss (there is nothing to fetch from). Swapping in a networked
/// `SwarmSession` requires no changes to [`SwarmProvider`] or `Chain`.
#[derive(Default)]
pub struct NoopSwarmSession;

impl SwarmSession for NoopSwarmSession {
    fn fetch_by_hash(&self, link: &str) -> Result<PathBuf, ProviderError> {
        Err(ProviderError::Swarm(format!(
            "no swarm session available to fetch {link}"
        )))
    }

    fn seed(&self, path: &Path) -> Result<String, ProviderError> {
        let hash = hash_of_file(path)?;
        Ok(format!("magnet:?xt=urn:btih:{hash}"))
    }

    fn peers(&self, _port: u16) -> HashSet<Node> {
        HashSet::new()
    }
}

/// Provider backed by a BitTorrent-like swarm session, mirroring
/// `BitTorrentProvider`: local cache first, fall back to a swarm fetch.
pub struct SwarmProvider {
    cache_folder: PathBuf,
    session: Box<dyn SwarmSession>,
}

impl SwarmProvider {
    pub fn new(cache_folder: impl Into<PathBuf>, session: Box<dyn SwarmSession>) -> Self {
        Self {
            cache_folder: cache_folder.into(),
            session,
        }
    }
}

impl Provider for SwarmProvider {
    fn path(
        &self,
        hash: &str,
        link: Option<&str>,
        skip_check: bool,
    ) -> Result<Option<PathBuf>, ProviderError> {
        if let Some(local) = file_for_hash(hash, &self.cache_folder) {
            return Ok(Some(local));
        }
        let Some(link) = link else {
            return Ok(None);
        };
        let fetched = self.session.fetch_by_hash(link)?;
        if skip_check {
            return Ok(Some(fetched));
        }
        if hash_of_file(&fetched)? == hash {
            Ok(Some(fetched))
        } else {
            Ok(None)
        }
    }

    fn distribute(&self, hash: &str) -> Result<Option<String>, ProviderError> {
        let Some(local) = file_for_hash(hash, &self.cache_folder) else {
            return Ok(None);
        };
        Ok(Some(self.session.seed(&local)?))
    }

    fn write(&self, _name: &str, _content: &[u8]) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }

    fn copy(&self, _path: &Path) -> Result<Option<PathBuf>, ProviderError> {
        Ok(None)
    }

    fn nodes(&self, port: u16) -> HashSet<Node> {
        self.session.peers(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn distribute_is_idempotent_for_local_content() {
        let dir = TempDir::new().unwrap();
        let hash = hex::encode(sha2::Sha256::digest(b"weights"));
        let sub = dir.path().join(&hash);
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("model.pt"), b"weights").unwrap();

        let provider = SwarmProvider::new(dir.path(), Box::new(NoopSwarmSession));
        let first = provider.distribute(&hash).unwrap().unwrap();
        let second = provider.distribute(&hash).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn distribute_misses_for_content_not_in_cache() {
        let dir = TempDir::new().unwrap();
        let provider = SwarmProvider::new(dir.path(), Box::new(NoopSwarmSession));
        assert!(provider.distribute("deadbeef").unwrap().is_none());
    }
}
