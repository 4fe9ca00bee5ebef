//! Maps a `benchmark_id` to a concrete [`Benchmark`] instance.
//!
//! Keeps a table of constructors rather than a fixed `{id: Benchmark}`
//! map of already-built instances, so a benchmark with different
//! configuration (or a fake, for tests) can be registered under the same
//! id without a real network service behind it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{Benchmark, BenchmarkError, HttpBenchmarkClient};

type Constructor = Arc<dyn Fn() -> Result<Arc<dyn Benchmark>, BenchmarkError> + Send + Sync>;

/// Constructs benchmarks by id from a registered table of constructors.
pub struct BenchmarkFactory {
    constructors: HashMap<String, Constructor>,
}

impl BenchmarkFactory {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers a constructor for `benchmark_id`, overwriting any
    /// previous registration for the same id.
    pub fn register(
        &mut self,
        benchmark_id: impl Into<String>,
        constructor: impl Fn() -> Result<Arc<dyn Benchmark>, BenchmarkError> + Send + Sync + 'static,
    ) {
        self.constructors.insert(benchmark_id.into(), Arc::new(constructor));
    }

    /// The genesis-compatible factory: just `"mnist"`, backed by the HTTP
    /// benchmark service at `base_url`.
    pub fn with_default_registry(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        let mut factory = Self::new();
        factory.register("mnist", move || {
            HttpBenchmarkClient::new("mnist", base_url.clone(), timeout)
                .map(|client| Arc::new(client) as Arc<dyn Benchmark>)
        });
        factory
    }

    pub fn is_known(&self, benchmark_id: &str) -> bool {
        self.constructors.contains_key(benchmark_id)
    }

    /// Instantiates a [`Benchmark`] for `benchmark_id`, or `None` if it is
    /// not in the known registry.
    pub fn create(&self, benchmark_id: &str) -> Result<Option<Arc<dyn Benchmark>>, BenchmarkError> {
        match self.constructors.get(benchmark_id) {
            Some(constructor) => Ok(Some(constructor()?)),
            None => Ok(None),
        }
    }
}

impl Default for BenchmarkFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_benchmark_id_is_rejected() {
        let factory = BenchmarkFactory::with_default_registry("http://127.0.0.1:8080", Duration::from_secs(1));
        assert!(factory.create("imagenet").unwrap().is_none());
    }

    #[test]
    fn known_benchmark_id_constructs_a_client() {
        let factory = BenchmarkFactory::with_default_registry("http://127.0.0.1:8080", Duration::from_secs(1));
        let benchmark = factory.create("mnist").unwrap();
        assert!(benchmark.is_some());
        assert_eq!(benchmark.unwrap().benchmark_id(), "mnist");
    }

    #[test]
    fn a_registered_fake_shadows_is_known_and_create() {
        let mut factory = BenchmarkFactory::new();
        factory.register("toy", || Err(BenchmarkError::Service("not implemented".to_string())));
        assert!(factory.is_known("toy"));
        assert!(factory.create("toy").is_err());
        assert!(!factory.is_known("mnist"));
    }
}
