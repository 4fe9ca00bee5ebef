//! RocksDB-backed chain snapshot store.
//!
//! Persists the whole chain under one fixed key in a `"chain"` column
//! family rather than keying per block. The chain is replaced wholesale
//! on fork resolution, not appended block-by-block from storage's
//! perspective (see `chain::store`).

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, DB, Options};

use crate::chain::ChainStore;
use crate::entities::Block;

const CHAIN_KEY: &[u8] = b"chain";

/// Configuration for [`RocksDbChainStore`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if
    /// they do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/chain-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// Storage-level error type.
#[derive(Debug)]
pub enum StorageError {
    RocksDb(rocksdb::Error),
    MissingColumnFamily(&'static str),
}

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        StorageError::RocksDb(e)
    }
}

/// RocksDB-backed implementation of [`ChainStore`].
pub struct RocksDbChainStore {
    db: DB,
}

impl RocksDbChainStore {
    /// Opens (or creates) a RocksDB-backed chain store at the given path.
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new("chain", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self { db })
    }

    fn cf_chain(&self) -> Result<std::sync::Arc<rocksdb::BoundColumnFamily<'_>>, StorageError> {
        self.db
            .cf_handle("chain")
            .ok_or(StorageError::MissingColumnFamily("chain"))
    }
}

impl ChainStore for RocksDbChainStore {
    fn load(&self) -> Option<Vec<Block>> {
        let cf = self.cf_chain().ok()?;
        let bytes = self.db.get_cf(&cf, CHAIN_KEY).ok()??;
        serde_json::from_slice(&bytes).ok()
    }

    fn save(&mut self, blocks: &[Block]) {
        let Ok(cf) = self.cf_chain() else {
            eprintln!("RocksDbChainStore::save: missing 'chain' CF");
            return;
        };
        match serde_json::to_vec(blocks) {
            Ok(bytes) => {
                if let Err(e) = self.db.put_cf(&cf, CHAIN_KEY, bytes) {
                    eprintln!("RocksDbChainStore::save failed: {e}");
                }
            }
            Err(e) => eprintln!("RocksDbChainStore::save: failed to serialise chain: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Wallet;
    use crate::entities::{ModelRef, Proof};
    use tempfile::TempDir;

    fn sample_block() -> Block {
        Block::new(
            Vec::new(),
            0.0,
            "0",
            Wallet::from_identity("aa"),
            Proof::new(94.24, "mnist", "", "", "", ModelRef::new("h", "m")),
        )
    }

    #[test]
    fn rocksdb_store_roundtrips_a_chain_snapshot() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };

        let mut store = RocksDbChainStore::open(&cfg).expect("open RocksDB");
        assert!(store.load().is_none());

        let blocks = vec![sample_block()];
        store.save(&blocks);
        assert_eq!(store.load().unwrap(), blocks);
    }
}
