//! The ordered block list, balance projection, and fork resolution.

pub mod store;

pub use store::ChainStore;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::benchmark::{BenchmarkFactory, model_from_path};
use crate::crypto::Wallet;
use crate::entities::{Block, ModelRef, Proof};
use crate::provider::Provider;

/// Reward paid to a block's miner, independent of any transaction fees.
pub const MINING_REWARD: f64 = 50.0;

/// SHA-256 of the genesis model artifact.
pub const GENESIS_MODEL_HASH: &str =
    "18ed48295aa46270de8d4bb6974599becfd3f8c6cc5efb4d62956ae364992628";
/// Baseline completion recorded in the genesis block (MNIST).
pub const GENESIS_COMPLETION: f64 = 94.24;
/// Benchmark the genesis block's proof is recorded against.
pub const GENESIS_BENCHMARK_ID: &str = "mnist";
/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Why a block or chain was rejected. Never propagated as a panic, every
/// check that can fail returns a `bool`/`Result` and the caller treats
/// rejection as a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    PreviousHashMismatch,
    InvalidProof,
    ScoreMismatch { expected: f64, evaluated: f64 },
    UnknownBenchmark(String),
    ModelUnavailable,
    UnsupportedModelFormat,
    NotMonotone { benchmark_id: String },
    NegativeBalance(Wallet),
    BadSignature,
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::PreviousHashMismatch => write!(f, "previous_hash does not match prior block"),
            ChainError::InvalidProof => write!(f, "proof failed structural validation"),
            ChainError::ScoreMismatch { expected, evaluated } => {
                write!(f, "re-evaluated score {evaluated} does not match claimed completion {expected}")
            }
            ChainError::UnknownBenchmark(id) => write!(f, "benchmark_id {id} is not in the known registry"),
            ChainError::ModelUnavailable => write!(f, "model artifact could not be resolved through the provider"),
            ChainError::UnsupportedModelFormat => write!(f, "model artifact suffix is not a known format"),
            ChainError::NotMonotone { benchmark_id } => {
                write!(f, "completion did not strictly improve for benchmark {benchmark_id}")
            }
            ChainError::NegativeBalance(wallet) => write!(f, "wallet {} would go negative", wallet.identity()),
            ChainError::BadSignature => write!(f, "transaction signature does not verify"),
        }
    }
}

impl std::error::Error for ChainError {}

/// Pulls the `btih` info-hash out of a `magnet:?xt=urn:btih:<hash>&...` link,
/// the same hash [`crate::provider::swarm::NoopSwarmSession::seed`] embeds.
fn hash_from_magnet_link(link: &str) -> Option<&str> {
    let (_, rest) = link.split_once("btih:")?;
    Some(rest.split(['&', '?']).next().unwrap_or(rest))
}

/// The ordered, append-only block list plus the collaborators needed to
/// verify blocks against it: a content-addressed [`Provider`] for model
/// artifacts and a [`BenchmarkFactory`] for re-evaluation.
pub struct Chain {
    blocks: Vec<Block>,
    provider: Arc<dyn Provider>,
    benchmark_factory: Arc<BenchmarkFactory>,
}

impl Chain {
    /// Builds a new chain from a fixed genesis block naming `genesis_miner`
    /// as the recipient of the first mining reward.
    pub fn genesis(
        genesis_miner: Wallet,
        provider: Arc<dyn Provider>,
        benchmark_factory: Arc<BenchmarkFactory>,
    ) -> Self {
        let genesis = Block::new(
            Vec::new(),
            0.0,
            GENESIS_PREVIOUS_HASH,
            genesis_miner,
            Proof::new(
                GENESIS_COMPLETION,
                GENESIS_BENCHMARK_ID,
                "",
                "",
                "",
                ModelRef::new(GENESIS_MODEL_HASH, ""),
            ),
        );
        Self {
            blocks: vec![genesis],
            provider,
            benchmark_factory,
        }
    }

    /// Restores a chain from a previously persisted block list. The caller
    /// is responsible for having validated it (e.g. via `validate_chain`)
    /// before trusting it.
    pub fn from_blocks(
        blocks: Vec<Block>,
        provider: Arc<dyn Provider>,
        benchmark_factory: Arc<BenchmarkFactory>,
    ) -> Self {
        Self {
            blocks,
            provider,
            benchmark_factory,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last_block(&self) -> &Block {
        self.blocks.last().expect("chain always has at least genesis")
    }

    /// The most recent block whose `benchmark_id` matches `benchmark_id`,
    /// i.e. the block a new proof for that benchmark must strictly beat.
    pub fn last_benchmark_block(&self, benchmark_id: &str) -> Option<&Block> {
        self.blocks
            .iter()
            .rev()
            .find(|b| b.proof.benchmark_id == benchmark_id)
    }

    /// Checks `block.proof.valid()`, resolves the model through the
    /// provider, re-evaluates it, and compares against the claimed
    /// completion.
    pub fn verify_block(&self, block: &Block) -> Result<(), ChainError> {
        if !block.proof.valid() {
            return Err(ChainError::InvalidProof);
        }

        let benchmark = self
            .benchmark_factory
            .create(&block.proof.benchmark_id)
            .map_err(|_| ChainError::UnknownBenchmark(block.proof.benchmark_id.clone()))?
            .ok_or_else(|| ChainError::UnknownBenchmark(block.proof.benchmark_id.clone()))?;

        let model_ref = &block.proof.model;
        let path = self
            .provider
            .path(&model_ref.model_hash, Some(&model_ref.magnet_link), false)
            .map_err(|_| ChainError::ModelUnavailable)?
            .ok_or(ChainError::ModelUnavailable)?;

        let model = model_from_path(path).ok_or(ChainError::UnsupportedModelFormat)?;

        let evaluated = benchmark
            .evaluate(model.as_ref())
            .map_err(|_| ChainError::ModelUnavailable)?;
        let evaluated = crate::entities::proof::round_completion(evaluated);

        if evaluated != block.proof.completion {
            return Err(ChainError::ScoreMismatch {
                expected: block.proof.completion,
                evaluated,
            });
        }

        Ok(())
    }

    /// Appends `block` iff its `previous_hash` matches the current tip, its
    /// completion strictly improves on the most recent block sharing its
    /// `benchmark_id` (if any), and it passes [`Chain::verify_block`].
    /// Rejects without mutation otherwise.
    pub fn add_block(&mut self, block: Block) -> Result<(), ChainError> {
        if block.previous_hash != self.last_block().hash() {
            return Err(ChainError::PreviousHashMismatch);
        }
        if let Some(prior) = self.last_benchmark_block(&block.proof.benchmark_id) {
            if block.proof.completion <= prior.proof.completion {
                return Err(ChainError::NotMonotone {
                    benchmark_id: block.proof.benchmark_id.clone(),
                });
            }
        }
        self.verify_block(&block)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Projected balance of `wallet` across the whole chain: `+MINING_REWARD`
    /// per block it mined, `-value`/`+value` on transaction sender/recipient,
    /// `+gas` to the block's miner, `-gas` from the sender.
    pub fn balance(&self, wallet: &Wallet) -> f64 {
        let mut balance = 0.0;
        for block in &self.blocks {
            if &block.miner_wallet == wallet {
                balance += MINING_REWARD;
            }
            for signed in &block.transactions {
                let tx = &signed.transaction;
                if &tx.sender == wallet {
                    balance -= tx.value;
                    balance -= tx.gas;
                }
                if &tx.recipient == wallet {
                    balance += tx.value;
                }
                if &block.miner_wallet == wallet {
                    balance += tx.gas;
                }
            }
        }
        balance
    }

    /// Walks the chain in order, re-verifying every non-genesis block's
    /// proof, every transaction's signature, monotone improvement per
    /// benchmark, and non-negative balances at every prefix.
    pub fn validate_chain(&self) -> bool {
        self.validate_chain_detailed().is_ok()
    }

    fn validate_chain_detailed(&self) -> Result<(), ChainError> {
        let mut balances: HashMap<String, f64> = HashMap::new();
        let mut last_completion_by_benchmark: HashMap<String, f64> = HashMap::new();

        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                let previous = &self.blocks[i - 1];
                if block.previous_hash != previous.hash() {
                    return Err(ChainError::PreviousHashMismatch);
                }
                self.verify_block(block)?;

                if let Some(&prior) = last_completion_by_benchmark.get(&block.proof.benchmark_id) {
                    if block.proof.completion <= prior {
                        return Err(ChainError::NotMonotone {
                            benchmark_id: block.proof.benchmark_id.clone(),
                        });
                    }
                }
            }
            last_completion_by_benchmark
                .insert(block.proof.benchmark_id.clone(), block.proof.completion);

            *balances.entry(block.miner_wallet.identity().to_string()).or_insert(0.0) +=
                MINING_REWARD;

            for signed in &block.transactions {
                if !signed.verify() {
                    return Err(ChainError::BadSignature);
                }
                let tx = &signed.transaction;
                *balances.entry(tx.sender.identity().to_string()).or_insert(0.0) -=
                    tx.value + tx.gas;
                *balances.entry(tx.recipient.identity().to_string()).or_insert(0.0) += tx.value;
                *balances.entry(block.miner_wallet.identity().to_string()).or_insert(0.0) +=
                    tx.gas;

                if balances[tx.sender.identity()] < 0.0 {
                    return Err(ChainError::NegativeBalance(tx.sender.clone()));
                }
            }
        }
        Ok(())
    }

    /// Serialises the chain to canonical JSON, compresses it, writes it
    /// through the provider, and returns the distribute link.
    ///
    /// Uses `zstd` for compression, see `DESIGN.md`.
    pub fn magnet_link(&self) -> Result<Option<String>, ChainError> {
        let bytes = serde_json::to_vec(&self.blocks).expect("chain should always serialise");
        let compressed = zstd::encode_all(bytes.as_slice(), 0).map_err(|_| ChainError::ModelUnavailable)?;
        let hash = self
            .provider
            .write("chain.json.zst", &compressed)
            .map_err(|_| ChainError::ModelUnavailable)?;
        let Some(hash) = hash else { return Ok(None) };
        self.provider
            .distribute(&hash)
            .map_err(|_| ChainError::ModelUnavailable)
    }

    /// Longest-valid-chain fork choice: fetches the candidate chain behind
    /// `link`, and replaces the local chain iff it is strictly longer and
    /// validates.
    pub fn resolve_conflict(&mut self, link: &str) -> Result<bool, ChainError> {
        if Some(link.to_string()) == self.magnet_link()? {
            return Ok(false);
        }

        // A magnet URI is self-describing: its `btih` parameter already is
        // the content hash, so a provider with the content cached locally
        // (this node's own snapshot, or one it already fetched for a peer)
        // resolves it without touching the swarm at all.
        let hash = hash_from_magnet_link(link).unwrap_or_default();
        let path = self
            .provider
            .path(hash, Some(link), true)
            .map_err(|_| ChainError::ModelUnavailable)?;
        let Some(path) = path else { return Ok(false) };

        let compressed = std::fs::read(path).map_err(|_| ChainError::ModelUnavailable)?;
        let bytes = zstd::decode_all(compressed.as_slice()).map_err(|_| ChainError::ModelUnavailable)?;
        let candidate_blocks: Vec<Block> =
            serde_json::from_slice(&bytes).map_err(|_| ChainError::ModelUnavailable)?;

        if candidate_blocks.len() <= self.blocks.len() {
            return Ok(false);
        }

        let candidate = Chain {
            blocks: candidate_blocks,
            provider: Arc::clone(&self.provider),
            benchmark_factory: Arc::clone(&self.benchmark_factory),
        };
        if !candidate.validate_chain() {
            return Ok(false);
        }

        self.blocks = candidate.blocks;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{Benchmark, BenchmarkError, Model};
    use crate::crypto::OpenedWallet;
    use crate::entities::{SignedTransaction, Transaction};
    use crate::provider::FileProvider;
    use std::collections::HashMap as StdHashMap;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;
    use tempfile::TempDir;

    fn genesis_chain(dir: &TempDir) -> Chain {
        let provider: Arc<dyn Provider> = Arc::new(FileProvider::new(dir.path()));
        let factory = Arc::new(crate::benchmark::BenchmarkFactory::with_default_registry(
            "http://127.0.0.1:0",
            std::time::Duration::from_millis(1),
        ));
        let genesis_miner = Wallet::from_identity("aa");
        Chain::genesis(genesis_miner, provider, factory)
    }

    #[test]
    fn genesis_chain_has_expected_balance() {
        let dir = TempDir::new().unwrap();
        let chain = genesis_chain(&dir);
        let genesis_miner = chain.last_block().miner_wallet.clone();
        assert_eq!(chain.balance(&genesis_miner), MINING_REWARD);
    }

    #[test]
    fn previous_hash_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut chain = genesis_chain(&dir);
        let bogus = Block::new(
            Vec::new(),
            1.0,
            "not-the-real-previous-hash",
            Wallet::from_identity("bb"),
            Proof::new(99.0, "mnist", "", "", "", ModelRef::new("h", "m")),
        );
        assert_eq!(chain.add_block(bogus), Err(ChainError::PreviousHashMismatch));
    }

    /// Always returns the same score for `evaluate`, regardless of which
    /// model it's handed. Good enough for a single re-evaluation, but would
    /// make a chain of more than one non-genesis block self-contradictory
    /// (every block would re-evaluate identically, so none could strictly
    /// improve on the last), use [`PathKeyedBenchmark`] for those.
    struct FixedScoreBenchmark {
        id: String,
        score: f64,
    }

    impl Benchmark for FixedScoreBenchmark {
        fn benchmark_id(&self) -> &str {
            &self.id
        }

        fn mine(&self, _previous: f64, _model: &dyn Model, _cancel: &AtomicBool) -> Result<(PathBuf, f64), BenchmarkError> {
            Err(BenchmarkError::Service("mine not exercised by this fake".to_string()))
        }

        fn evaluate(&self, _model: &dyn Model) -> Result<f64, BenchmarkError> {
            Ok(self.score)
        }
    }

    fn fixed_score_factory(benchmark_id: &str, score: f64) -> Arc<BenchmarkFactory> {
        let mut factory = BenchmarkFactory::new();
        let id = benchmark_id.to_string();
        factory.register(benchmark_id, move || {
            Ok(Arc::new(FixedScoreBenchmark { id: id.clone(), score }) as Arc<dyn Benchmark>)
        });
        Arc::new(factory)
    }

    /// Returns a score keyed by the evaluated model's resolved path rather
    /// than a single constant, so a multi-block chain can carry a distinct,
    /// strictly increasing completion per block while still being
    /// idempotent under repeated re-validation (e.g. from `resolve_conflict`
    /// re-checking the whole candidate chain).
    struct PathKeyedBenchmark {
        id: String,
        scores: StdHashMap<PathBuf, f64>,
    }

    impl Benchmark for PathKeyedBenchmark {
        fn benchmark_id(&self) -> &str {
            &self.id
        }

        fn mine(&self, _previous: f64, _model: &dyn Model, _cancel: &AtomicBool) -> Result<(PathBuf, f64), BenchmarkError> {
            Err(BenchmarkError::Service("mine not exercised by this fake".to_string()))
        }

        fn evaluate(&self, model: &dyn Model) -> Result<f64, BenchmarkError> {
            self.scores
                .get(model.path())
                .copied()
                .ok_or_else(|| BenchmarkError::Service(format!("no fixed score for {:?}", model.path())))
        }
    }

    fn path_keyed_factory(benchmark_id: &str, scores: StdHashMap<PathBuf, f64>) -> Arc<BenchmarkFactory> {
        let mut factory = BenchmarkFactory::new();
        let id = benchmark_id.to_string();
        factory.register(benchmark_id, move || {
            Ok(Arc::new(PathKeyedBenchmark { id: id.clone(), scores: scores.clone() }) as Arc<dyn Benchmark>)
        });
        Arc::new(factory)
    }

    /// Writes `content` under `name` through `provider` and returns both a
    /// usable `ModelRef` and the path it resolves to, so a test can build a
    /// `PathKeyedBenchmark`'s score table ahead of time.
    fn write_model(provider: &dyn Provider, name: &str, content: &[u8]) -> (ModelRef, PathBuf) {
        let hash = provider.write(name, content).unwrap().unwrap();
        let path = provider.path(&hash, None, false).unwrap().unwrap();
        (ModelRef::new(hash, ""), path)
    }

    #[test]
    fn strictly_improving_completion_is_accepted() {
        let dir = TempDir::new().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(FileProvider::new(dir.path()));
        let factory = fixed_score_factory("mnist", 95.0);
        let mut chain = Chain::genesis(Wallet::from_identity("aa"), Arc::clone(&provider), factory);

        let (model_ref, _) = write_model(&*provider, "model.pt", b"weights");
        let block = Block::new(
            Vec::new(),
            1.0,
            chain.last_block().hash(),
            Wallet::from_identity("bb"),
            Proof::new(95.0, "mnist", "", "", "", model_ref),
        );
        assert!(chain.add_block(block).is_ok());
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn non_improving_completion_is_rejected_without_reaching_verify_block() {
        let dir = TempDir::new().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(FileProvider::new(dir.path()));
        let factory = fixed_score_factory("mnist", 95.0);
        let mut chain = Chain::genesis(Wallet::from_identity("aa"), Arc::clone(&provider), factory);

        // The genesis completion is GENESIS_COMPLETION (94.24); a block
        // claiming the same 94.24 fails the monotonic check before the
        // (bogus, unresolvable) model reference would even be looked up.
        let block = Block::new(
            Vec::new(),
            1.0,
            chain.last_block().hash(),
            Wallet::from_identity("bb"),
            Proof::new(GENESIS_COMPLETION, "mnist", "", "", "", ModelRef::new("does-not-exist", "")),
        );
        assert_eq!(
            chain.add_block(block),
            Err(ChainError::NotMonotone { benchmark_id: "mnist".to_string() })
        );
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn simple_transfer_scenario_matches_expected_balances() {
        let dir = TempDir::new().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(FileProvider::new(dir.path()));
        let factory = fixed_score_factory("mnist", 95.0);

        let alice = OpenedWallet::from_seed(&[7u8; 32]);
        let bob = OpenedWallet::from_seed(&[8u8; 32]).public();

        let mut chain = Chain::genesis(alice.public(), Arc::clone(&provider), factory);
        let (model_ref, _) = write_model(&*provider, "model.pt", b"weights");

        let tx = Transaction::new(alice.public(), bob.clone(), 30.0, 0.0, "", 0.1);
        let signature = alice.sign(&tx.canonical_bytes());
        let signed = SignedTransaction::new(tx, signature);

        let block = Block::new(
            vec![signed],
            1.0,
            chain.last_block().hash(),
            alice.public(),
            Proof::new(95.0, "mnist", "", "", "", model_ref),
        );
        chain.add_block(block).expect("block should be accepted");

        // alice: +50 (genesis reward) +50 (second reward) -30 (sent) +0.1 (own gas back) -0.1 (gas paid)
        assert_eq!(chain.balance(&alice.public()), 100.0 - 30.0);
        assert_eq!(chain.balance(&bob), 30.0);
        assert!(chain.validate_chain());
    }

    #[test]
    fn validate_chain_rejects_a_chain_that_drives_a_balance_negative() {
        let dir = TempDir::new().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(FileProvider::new(dir.path()));
        let factory = fixed_score_factory("mnist", 95.0);

        let alice = OpenedWallet::from_seed(&[9u8; 32]);
        let bob = OpenedWallet::from_seed(&[10u8; 32]);

        let genesis = Chain::genesis(bob.public(), Arc::clone(&provider), Arc::clone(&factory));
        let (model_ref, _) = write_model(&*provider, "model.pt", b"weights");

        // alice never mined anything, so any positive send from her drives
        // her projected balance negative.
        let tx = Transaction::new(alice.public(), bob.public(), 10.0, 0.0, "", 0.1);
        let signature = alice.sign(&tx.canonical_bytes());
        let signed = SignedTransaction::new(tx, signature);

        let block = Block::new(
            vec![signed],
            1.0,
            genesis.last_block().hash(),
            bob.public(),
            Proof::new(95.0, "mnist", "", "", "", model_ref),
        );

        let mut blocks = genesis.blocks().to_vec();
        blocks.push(block);
        let tampered = Chain::from_blocks(blocks, provider, factory);

        assert!(!tampered.validate_chain());
    }

    #[test]
    fn resolve_conflict_adopts_a_strictly_longer_valid_chain() {
        let dir = TempDir::new().unwrap();
        // `FileProvider::distribute` never yields a link on its own (it has
        // nothing to seed through), so pair it with a `SwarmProvider` over
        // the same cache directory, the way `main.rs` composes the two, so
        // `magnet_link()` has something to hand back.
        let provider: Arc<dyn Provider> = Arc::new(crate::provider::JointProvider::new(vec![
            Box::new(FileProvider::new(dir.path())),
            Box::new(crate::provider::SwarmProvider::new(
                dir.path(),
                Box::new(crate::provider::swarm::NoopSwarmSession),
            )),
        ]));

        let genesis_miner = Wallet::from_identity("aa");

        let (model_ref_1, path_1) = write_model(&*provider, "model-1.pt", b"weights-1");
        let (model_ref_2, path_2) = write_model(&*provider, "model-2.pt", b"weights-2");
        let mut scores = StdHashMap::new();
        scores.insert(path_1, 95.0);
        scores.insert(path_2, 96.0);
        let factory = path_keyed_factory("mnist", scores);

        let mut long_chain = Chain::genesis(genesis_miner.clone(), Arc::clone(&provider), Arc::clone(&factory));
        for (i, model_ref) in [model_ref_1, model_ref_2].into_iter().enumerate() {
            let score = 95.0 + i as f64;
            let block = Block::new(
                Vec::new(),
                1.0,
                long_chain.last_block().hash(),
                Wallet::from_identity("bb"),
                Proof::new(score, "mnist", "", "", "", model_ref),
            );
            long_chain.add_block(block).expect("each block should extend cleanly");
        }
        assert_eq!(long_chain.len(), 3);

        let link = long_chain.magnet_link().unwrap().expect("provider should distribute the snapshot");

        let mut short_chain = Chain::genesis(genesis_miner, provider, factory);
        assert_eq!(short_chain.len(), 1);

        let replaced = short_chain.resolve_conflict(&link).expect("resolve_conflict should succeed");
        assert!(replaced);
        assert_eq!(short_chain.len(), 3);

        // Re-running against the same link is now a no-op: it's already our chain.
        let replaced_again = short_chain.resolve_conflict(&link).expect("resolve_conflict should succeed");
        assert!(!replaced_again);
        assert_eq!(short_chain.len(), 3);
    }
}
