//! In-memory chain snapshot store, useful for tests and single-run
//! devnets that don't need to survive a restart.

use crate::chain::ChainStore;
use crate::entities::Block;

#[derive(Default)]
pub struct InMemoryChainStore {
    blocks: Option<Vec<Block>>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for InMemoryChainStore {
    fn load(&self) -> Option<Vec<Block>> {
        self.blocks.clone()
    }

    fn save(&mut self, blocks: &[Block]) {
        self.blocks = Some(blocks.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Wallet;
    use crate::entities::{ModelRef, Proof};

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
    fn load_before_any_save_is_none() {
        let store = InMemoryChainStore::new();
        assert!(store.load().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = InMemoryChainStore::new();
        let blocks = vec![sample_block()];
        store.save(&blocks);
        assert_eq!(store.load().unwrap(), blocks);
    }
}
