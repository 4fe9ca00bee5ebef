//! The cancellable worker that produces a new, strictly-improving [`Proof`].
//!
//! The mining pipeline runs on a dedicated `spawn_blocking` worker, never
//! the I/O loop, and reports back through a channel rather than a
//! shared-mutable callback.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::benchmark::{BenchmarkError, BenchmarkFactory, model_from_path};
use crate::entities::{Block, ModelRef, Proof};
use crate::provider::Provider;

/// `{IDLE -> RUNNING -> COMPLETE | CANCELLED | FAILED}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineTaskState {
    Idle,
    Running,
    Complete,
    Cancelled,
    Failed,
}

/// Why a mine task did not produce a proof.
#[derive(Debug)]
pub enum MineTaskError {
    /// `stop()` was called before the pipeline finished.
    Cancelled,
    /// The previous model artifact could not be resolved through the
    /// provider.
    ModelUnavailable,
    /// The artifact's suffix does not map to a known model format.
    UnsupportedModelFormat,
    /// The benchmark collaborator raised. Treated as fatal to the mining
    /// subsystem, not just this run.
    Fatal(BenchmarkError),
}

impl fmt::Display for MineTaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MineTaskError::Cancelled => write!(f, "mine task cancelled"),
            MineTaskError::ModelUnavailable => write!(f, "previous model artifact unavailable"),
            MineTaskError::UnsupportedModelFormat => write!(f, "model artifact format not supported"),
            MineTaskError::Fatal(e) => write!(f, "mine task failed fatally: {e}"),
        }
    }
}

impl std::error::Error for MineTaskError {}

/// Outcome sent back to the I/O loop when a mine task finishes, one way
/// or another.
pub type MineOutcome = Result<Proof, MineTaskError>;

/// A handle to one in-flight (or finished) mining worker.
pub struct MineTask {
    cancel: Arc<AtomicBool>,
    join_handle: JoinHandle<()>,
}

impl MineTask {
    /// Spawns the five-step pipeline against `target`'s proof (the
    /// benchmark target to beat) on a blocking worker thread. The
    /// outcome is sent on `result_tx` exactly once.
    pub fn spawn(
        target: Block,
        provider: Arc<dyn Provider>,
        benchmark_factory: Arc<BenchmarkFactory>,
        result_tx: mpsc::UnboundedSender<MineOutcome>,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let join_handle = tokio::task::spawn_blocking(move || {
            let outcome = run_pipeline(&target, provider.as_ref(), &benchmark_factory, &worker_cancel);
            let _ = result_tx.send(outcome);
        });

        Self { cancel, join_handle }
    }

    /// Requests cancellation and waits for the worker to observe it.
    ///
    /// If the worker is currently blocked inside a swarm `fetch_by_hash`
    /// call, this can only return once that call itself returns. There is
    /// no way to interrupt a blocking provider call mid-flight.
    pub async fn stop(self) {
        self.cancel.store(true, Ordering::SeqCst);
        let _ = self.join_handle.await;
    }
}

fn run_pipeline(
    target: &Block,
    provider: &dyn Provider,
    benchmark_factory: &BenchmarkFactory,
    cancel: &AtomicBool,
) -> MineOutcome {
    if cancel.load(Ordering::SeqCst) {
        return Err(MineTaskError::Cancelled);
    }

    // Step 1: resolve the previous model artifact.
    let model_ref = &target.proof.model;
    let path = provider
        .path(&model_ref.model_hash, Some(&model_ref.magnet_link), false)
        .map_err(|_| MineTaskError::ModelUnavailable)?
        .ok_or(MineTaskError::ModelUnavailable)?;

    if cancel.load(Ordering::SeqCst) {
        return Err(MineTaskError::Cancelled);
    }

    // Step 2: construct a concrete model from the artifact's suffix.
    let model = model_from_path(path).ok_or(MineTaskError::UnsupportedModelFormat)?;

    // Step 3: drive the mutate/train/evaluate loop until it beats the
    // previous completion.
    let benchmark = benchmark_factory
        .create(&target.proof.benchmark_id)
        .map_err(MineTaskError::Fatal)?
        .ok_or(MineTaskError::ModelUnavailable)?;

    let (artifact_path, score) = benchmark
        .mine(target.proof.completion, model.as_ref(), cancel)
        .map_err(|e| match e {
            BenchmarkError::Cancelled => MineTaskError::Cancelled,
            other => MineTaskError::Fatal(other),
        })?;

    if cancel.load(Ordering::SeqCst) {
        return Err(MineTaskError::Cancelled);
    }

    // Step 4: hash and seed the winning artifact, building a fresh Proof.
    let bytes = std::fs::read(&artifact_path).map_err(|_| MineTaskError::ModelUnavailable)?;
    let model_hash = crate::entities::canon::hash_bytes(&bytes);
    let magnet_link = provider
        .distribute(&model_hash)
        .map_err(|_| MineTaskError::ModelUnavailable)?
        .unwrap_or_default();

    let proof = Proof::new(
        score,
        target.proof.benchmark_id.clone(),
        "",
        "",
        "",
        ModelRef::new(model_hash, magnet_link),
    );

    // Step 5: hand the proof to the caller.
    Ok(proof)
}
