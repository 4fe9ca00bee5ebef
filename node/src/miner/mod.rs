//! Mempool management and mining orchestration.
//!
//! The `Miner` itself never blocks. It lives on the I/O loop and drives
//! at most one [`mine_task::MineTask`] through an unbounded completion
//! channel.

pub mod mine_task;

pub use mine_task::{MineOutcome, MineTask, MineTaskError};

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use crate::benchmark::BenchmarkFactory;
use crate::chain::{Chain, ChainError};
use crate::crypto::{OpenedWallet, Wallet};
use crate::entities::{Block, Proof, SignedTransaction};
use crate::provider::Provider;

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Holds the mining identity, mempool, and at most one live [`MineTask`].
pub struct Miner {
    wallet: OpenedWallet,
    provider: Arc<dyn Provider>,
    benchmark_factory: Arc<BenchmarkFactory>,
    mempool: Vec<SignedTransaction>,
    active: Option<MineTask>,
    pending_previous_hash: Option<String>,
    result_tx: mpsc::UnboundedSender<MineOutcome>,
    result_rx: mpsc::UnboundedReceiver<MineOutcome>,
}

impl Miner {
    pub fn new(wallet: OpenedWallet, provider: Arc<dyn Provider>, benchmark_factory: Arc<BenchmarkFactory>) -> Self {
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        Self {
            wallet,
            provider,
            benchmark_factory,
            mempool: Vec::new(),
            active: None,
            pending_previous_hash: None,
            result_tx,
            result_rx,
        }
    }

    pub fn wallet(&self) -> Wallet {
        self.wallet.public()
    }

    pub fn mempool(&self) -> &[SignedTransaction] {
        &self.mempool
    }

    /// `chain.balance(wallet)` minus pending debits (value + gas) already
    /// queued in the mempool for transactions sent by `wallet`.
    pub fn unconfirmed_balance(&self, wallet: &Wallet, chain: &Chain) -> f64 {
        let pending_debits: f64 = self
            .mempool
            .iter()
            .filter(|signed| &signed.transaction.sender == wallet)
            .map(|signed| signed.transaction.value + signed.transaction.gas)
            .sum();
        chain.balance(wallet) - pending_debits
    }

    /// Idempotent acceptance of a signed transaction into the mempool.
    ///
    /// Returns `true` if an equal transaction is already present (no-op)
    /// or if it passes structural validity, signature verification, and
    /// the unconfirmed-balance check and is newly appended. Returns
    /// `false` on rejection, leaving the mempool unchanged.
    pub fn add_new_transaction(&mut self, signed: SignedTransaction, chain: &Chain) -> bool {
        if self.mempool.contains(&signed) {
            return true;
        }

        if !signed.transaction.valid() || !signed.verify() {
            return false;
        }

        let required = signed.transaction.value + signed.transaction.gas;
        if self.unconfirmed_balance(&signed.transaction.sender, chain) < required {
            return false;
        }

        self.mempool.push(signed);
        true
    }

    /// Cancels any in-flight task, then spawns a new one against
    /// `last_benchmark_block`'s proof, the completion this mine attempt
    /// must strictly beat. `last_block` anchors the eventual block's
    /// `previous_hash`, which may differ from `last_benchmark_block` when
    /// the chain has mined other benchmarks since.
    pub async fn mine(&mut self, last_block: &Block, last_benchmark_block: &Block) {
        self.cancel_active().await;

        self.pending_previous_hash = Some(last_block.hash());
        let task = MineTask::spawn(
            last_benchmark_block.clone(),
            Arc::clone(&self.provider),
            Arc::clone(&self.benchmark_factory),
            self.result_tx.clone(),
        );
        self.active = Some(task);
    }

    async fn cancel_active(&mut self) {
        if let Some(task) = self.active.take() {
            task.stop().await;
            // Drain the cancellation's own outcome so it doesn't get
            // mistaken for the next task's result by `poll_completed`.
            let _ = self.result_rx.try_recv();
        }
    }

    /// Non-blocking check for a finished mine task. Call from the I/O
    /// loop's select; never awaits.
    pub fn poll_completed(&mut self) -> Option<MineOutcome> {
        match self.result_rx.try_recv() {
            Ok(outcome) => {
                self.active = None;
                Some(outcome)
            }
            Err(_) => None,
        }
    }

    /// Finalises a successful mine outcome into a new block: packages the
    /// current mempool, stamps `previous_hash`, sets `proof`, clears the
    /// mempool, and appends the block to `chain`.
    pub fn finalize_mine(&mut self, proof: Proof, chain: &mut Chain) -> Result<(), ChainError> {
        let previous_hash = self.pending_previous_hash.take().unwrap_or_else(|| chain.last_block().hash());
        let transactions = std::mem::take(&mut self.mempool);

        let block = Block::new(transactions, now_seconds(), previous_hash, self.wallet.public(), proof);

        chain.add_block(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::BenchmarkFactory;
    use crate::entities::{ModelRef, Transaction};
    use crate::provider::FileProvider;
    use std::time::Duration;
    use tempfile::TempDir;

    fn harness() -> (TempDir, Arc<dyn Provider>, Arc<BenchmarkFactory>) {
        let dir = TempDir::new().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(FileProvider::new(dir.path()));
        let factory = Arc::new(BenchmarkFactory::with_default_registry(
            "http://127.0.0.1:0",
            Duration::from_millis(1),
        ));
        (dir, provider, factory)
    }

    fn genesis_chain(provider: Arc<dyn Provider>, factory: Arc<BenchmarkFactory>) -> (Chain, Wallet) {
        let genesis_miner = Wallet::from_identity("aa");
        let chain = Chain::genesis(genesis_miner.clone(), provider, factory);
        (chain, genesis_miner)
    }

    #[test]
    fn duplicate_transaction_is_idempotent() {
        let (_dir, provider, factory) = harness();
        let (chain, _) = genesis_chain(Arc::clone(&provider), Arc::clone(&factory));
        let mut miner = Miner::new(OpenedWallet::from_seed(&[7u8; 32]), provider, factory);

        let sender = OpenedWallet::from_seed(&[1u8; 32]);
        let recipient = OpenedWallet::from_seed(&[2u8; 32]).public();
        let tx = Transaction::new(sender.public(), recipient, 0.0, 0.0, "", 0.1);
        let signature = sender.sign(&tx.canonical_bytes());
        let signed = SignedTransaction::new(tx, signature);

        assert!(miner.add_new_transaction(signed.clone(), &chain));
        assert!(miner.add_new_transaction(signed, &chain));
        assert_eq!(miner.mempool().len(), 1);
    }

    #[test]
    fn second_transaction_exceeding_unconfirmed_balance_is_rejected() {
        let (_dir, provider, factory) = harness();
        let (mut chain, _genesis_miner) = genesis_chain(Arc::clone(&provider), Arc::clone(&factory));

        let sender = OpenedWallet::from_seed(&[1u8; 32]);
        let recipient = OpenedWallet::from_seed(&[2u8; 32]).public();

        // Give `sender` a balance of 50 by making it the next miner.
        let block = Block::new(
            Vec::new(),
            1.0,
            chain.last_block().hash(),
            sender.public(),
            Proof::new(94.31, "mnist", "", "", "", ModelRef::new(crate::chain::GENESIS_MODEL_HASH, "")),
        );
        // Bypass verify_block (no real benchmark service in this test) by
        // pushing directly through from_blocks.
        let mut blocks = chain.blocks().to_vec();
        blocks.push(block);
        chain = Chain::from_blocks(blocks, Arc::clone(&provider), Arc::clone(&factory));

        let mut miner = Miner::new(OpenedWallet::from_seed(&[7u8; 32]), provider, factory);

        let first = Transaction::new(sender.public(), recipient.clone(), 40.0, 0.0, "", 0.0 + 0.1);
        let first_sig = sender.sign(&first.canonical_bytes());
        assert!(miner.add_new_transaction(SignedTransaction::new(first, first_sig), &chain));

        let second = Transaction::new(sender.public(), recipient, 40.0, 1.0, "", 0.1);
        let second_sig = sender.sign(&second.canonical_bytes());
        assert!(!miner.add_new_transaction(SignedTransaction::new(second, second_sig), &chain));

        assert_eq!(miner.mempool().len(), 1);
    }
}
