//! The ML training/evaluation engine, as a narrow external contract.
//!
//! `Benchmark` stands in for the actual training and evaluation engine,
//! which this crate never implements directly, it only talks to it. The
//! one concrete, network-capable implementation is
//! [`http::HttpBenchmarkClient`]: a blocking `reqwest` client speaking
//! JSON request/response over a configured `base_url` and `timeout`.

pub mod factory;
pub mod http;
pub mod model;

pub use factory::BenchmarkFactory;
pub use http::HttpBenchmarkClient;
pub use model::{Model, model_from_path};

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

/// Errors raised by a `Benchmark` implementation.
#[derive(Debug)]
pub enum BenchmarkError {
    Transport(String),
    Service(String),
    Protocol(String),
    /// `MineTask::stop()` observed between training/evaluation steps.
    Cancelled,
}

impl fmt::Display for BenchmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkError::Transport(msg) => write!(f, "benchmark transport error: {msg}"),
            BenchmarkError::Service(msg) => write!(f, "benchmark service error: {msg}"),
            BenchmarkError::Protocol(msg) => write!(f, "benchmark protocol error: {msg}"),
            BenchmarkError::Cancelled => write!(f, "benchmark run cancelled"),
        }
    }
}

impl std::error::Error for BenchmarkError {}

/// A named evaluation task producing a scalar score in `[0, 100]`.
pub trait Benchmark: Send + Sync {
    /// The registry id this benchmark answers to (e.g. `"mnist"`).
    fn benchmark_id(&self) -> &str;

    /// Drives an outer mutation/training loop over `model` until a
    /// mutated-and-trained candidate evaluates strictly above
    /// `previous_completion`, honouring `cancel` at epoch/step
    /// boundaries. Returns the winning artifact's path and its score.
    fn mine(
        &self,
        previous_completion: f64,
        model: &dyn Model,
        cancel: &AtomicBool,
    ) -> Result<(PathBuf, f64), BenchmarkError>;

    /// Re-evaluates `model` against this benchmark, independent of any
    /// mining run. Used by `Chain::verify_block` to check a proof's
    /// claimed completion.
    fn evaluate(&self, model: &dyn Model) -> Result<f64, BenchmarkError>;
}
