//! Deterministic test-fixture node source.
//!
//! No `Faker`-equivalent crate is pulled in for this; a fixed-seed
//! `StdRng` generates reproducible loopback-range addresses instead.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use super::{DiscoveryError, NodeSource};
use crate::provider::Node;

pub struct RandomSource {
    seed: u64,
    count: usize,
}

impl RandomSource {
    pub fn new(seed: u64, count: usize) -> Self {
        Self { seed, count }
    }
}

impl NodeSource for RandomSource {
    fn discover(&self, port: u16) -> Result<HashSet<Node>, DiscoveryError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut nodes = HashSet::new();
        for _ in 0..self.count {
            let address = format!(
                "127.{}.{}.{}",
                rng.gen_range(0..255),
                rng.gen_range(0..255),
                rng.gen_range(1..255)
            );
            nodes.insert(Node::new(address, port));
        }
        Ok(nodes)
    }
}
