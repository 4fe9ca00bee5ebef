//! Composes providers, dispatching in order and returning the first
//! non-empty result.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{Node, Provider, ProviderError};

/// A provider that tries each of `providers` in turn.
pub struct JointProvider {
    providers: Vec<Box<dyn Provider>>,
}

impl JointProvider {
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self { providers }
    }
}

impl Provider for JointProvider {
    fn path(
        &self,
        hash: &str,
        link: Option<&str>,
        skip_check: bool,
    ) -> Result<Option<PathBuf>, ProviderError> {
        for provider in &self.providers {
            if let Some(path) = provider.path(hash, link, skip_check)? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    fn distribute(&self, hash: &str) -> Result<Option<String>, ProviderError> {
        for provider in &self.providers {
            if let Some(link) = provider.distribute(hash)? {
                return Ok(Some(link));
            }
        }
        Ok(None)
    }

    fn write(&self, name: &str, content: &[u8]) -> Result<Option<String>, ProviderError> {
        for provider in &self.providers {
            if let Some(hash) = provider.write(name, content)? {
                return Ok(Some(hash));
            }
        }
        Ok(None)
    }

    fn copy(&self, path: &Path) -> Result<Option<PathBuf>, ProviderError> {
        for provider in &self.providers {
            if let Some(new_path) = provider.copy(path)? {
                return Ok(Some(new_path));
            }
        }
        Ok(None)
    }

    fn nodes(&self, port: u16) -> HashSet<Node> {
        let mut nodes = HashSet::new();
        for provider in &self.providers {
            nodes.extend(provider.nodes(port));
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FileProvider;
    use crate::provider::swarm::{NoopSwarmSession, SwarmProvider};
    use tempfile::TempDir;

    #[test]
    fn first_provider_with_a_hit_wins() {
        let file_dir = TempDir::new().unwrap();
        let swarm_dir = TempDir::new().unwrap();
        let joint = JointProvider::new(vec![
            Box::new(FileProvider::new(file_dir.path())),
            Box::new(SwarmProvider::new(swarm_dir.path(), Box::new(NoopSwarmSession))),
        ]);

        let hash = joint.write("x", b"hello").unwrap().unwrap();
        let path = joint.path(&hash, None, false).unwrap();
        assert!(path.is_some());
    }

    #[test]
    fn miss_when_no_provider_has_content() {
        let file_dir = TempDir::new().unwrap();
        let swarm_dir = TempDir::new().unwrap();
        let joint = JointProvider::new(vec![
            Box::new(FileProvider::new(file_dir.path())),
            Box::new(SwarmProvider::new(swarm_dir.path(), Box::new(NoopSwarmSession))),
        ]);

        assert!(joint.path("deadbeef", None, false).unwrap().is_none());
    }
}
