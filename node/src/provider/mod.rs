//! Content-addressed storage: hash → path lookup, write, copy-in, and
//! distribution via a swarm.
//!
//! Every concrete provider is blocking by design: the only caller is
//! `MineTask`, which always runs on a dedicated worker thread, never the
//! I/O loop.

pub mod file;
pub mod joint;
pub mod node;
pub mod swarm;

pub use file::FileProvider;
pub use joint::JointProvider;
pub use node::Node;
pub use swarm::{SwarmProvider, SwarmSession};

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Errors a provider can raise. These are never fatal to the caller on
/// their own; a miss just means "reject the block/transaction that
/// referenced this content".
#[derive(Debug)]
pub enum ProviderError {
    /// Underlying filesystem I/O failure.
    Io(std::io::Error),
    /// The swarm collaborator failed to resolve or seed content.
    Swarm(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Io(e) => write!(f, "provider I/O error: {e}"),
            ProviderError::Swarm(msg) => write!(f, "swarm error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        ProviderError::Io(e)
    }
}

/// Content-addressed storage and distribution, composed via [`JointProvider`].
pub trait Provider: Send + Sync {
    /// Resolves `hash` to a local path whose SHA-256 equals `hash` (or, if
    /// `skip_check` is set, a path of unverified content, used for chain
    /// snapshots whose hash is not known ahead of time. Fetches through
    /// `link` if the content is not already local. Returns `Ok(None)` on a
    /// miss rather than erroring.
    fn path(
        &self,
        hash: &str,
        link: Option<&str>,
        skip_check: bool,
    ) -> Result<Option<PathBuf>, ProviderError>;

    /// Makes `hash` fetchable by other peers, returning a locator. Must be
    /// idempotent: repeated calls for the same hash return the same link.
    fn distribute(&self, hash: &str) -> Result<Option<String>, ProviderError>;

    /// Writes `content` under `name`, returning its content hash.
    fn write(&self, name: &str, content: &[u8]) -> Result<Option<String>, ProviderError>;

    /// Rehashes and imports the file at `path` into the cache, returning
    /// the new cache-relative path.
    fn copy(&self, path: &std::path::Path) -> Result<Option<PathBuf>, ProviderError>;

    /// Peers this provider is directly connected to (e.g. swarm peers).
    fn nodes(&self, port: u16) -> HashSet<Node>;
}
