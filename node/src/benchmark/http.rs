//! HTTP-based benchmark client.
//!
//! Talks to an external training/evaluation service over a small JSON
//! API. Grounded field-for-field on `ml_client::http::HttpMlVerifier`:
//! blocking `reqwest::blocking::Client`, a `base_url` + `timeout`
//! constructor, one `endpoint()` helper, request/response structs mapped
//! 1:1 onto the wire schema.
//!
//! ```json
//! POST /mine
//! { "benchmark_id": "mnist", "previous_completion": 94.24, "model_path": "/cache/.../model.pt" }
//! Response: { "artifact_path": "/cache/.../model-2.pt", "score": 94.31 }
//!
//! POST /evaluate
//! { "benchmark_id": "mnist", "model_path": "/cache/.../model.pt" }
//! Response: { "score": 94.24 }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{Benchmark, BenchmarkError, Model};

/// HTTP-based benchmark client for one `benchmark_id`.
///
/// Thread-safe and stateless beyond its HTTP client, so a single instance
/// can be shared across concurrently running `MineTask`s (a `Miner` only
/// ever runs one at a time, but nothing prevents several miners in one
/// process sharing a benchmark registry).
pub struct HttpBenchmarkClient {
    benchmark_id: String,
    base_url: String,
    client: Client,
}

impl HttpBenchmarkClient {
    pub fn new(
        benchmark_id: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BenchmarkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BenchmarkError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            benchmark_id: benchmark_id.into(),
            base_url: base_url.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
struct MineRequest<'a> {
    benchmark_id: &'a str,
    previous_completion: f64,
    model_path: String,
}

#[derive(Debug, Deserialize)]
struct MineResponse {
    artifact_path: String,
    score: f64,
}

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    benchmark_id: &'a str,
    model_path: String,
}

#[derive(Debug, Deserialize)]
struct EvaluateResponse {
    score: f64,
}

impl Benchmark for HttpBenchmarkClient {
    fn benchmark_id(&self) -> &str {
        &self.benchmark_id
    }

    fn mine(
        &self,
        previous_completion: f64,
        model: &dyn Model,
        cancel: &AtomicBool,
    ) -> Result<(PathBuf, f64), BenchmarkError> {
        if cancel.load(Ordering::SeqCst) {
            return Err(BenchmarkError::Cancelled);
        }

        let url = self.endpoint("/mine");
        let req_body = MineRequest {
            benchmark_id: &self.benchmark_id,
            previous_completion,
            model_path: model.path().display().to_string(),
        };

        let resp = self
            .client
            .post(&url)
            .json(&req_body)
            .send()
            .map_err(|e| BenchmarkError::Transport(format!("HTTP POST {url} failed: {e}")))?;

        if cancel.load(Ordering::SeqCst) {
            return Err(BenchmarkError::Cancelled);
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(BenchmarkError::Service(format!(
                "benchmark service returned HTTP status {status}"
            )));
        }

        let body = resp
            .json::<MineResponse>()
            .map_err(|e| BenchmarkError::Protocol(format!("failed to parse JSON response: {e}")))?;

        Ok((PathBuf::from(body.artifact_path), body.score))
    }

    fn evaluate(&self, model: &dyn Model) -> Result<f64, BenchmarkError> {
        let url = self.endpoint("/evaluate");
        let req_body = EvaluateRequest {
            benchmark_id: &self.benchmark_id,
            model_path: model.path().display().to_string(),
        };

        let resp = self
            .client
            .post(&url)
            .json(&req_body)
            .send()
            .map_err(|e| BenchmarkError::Transport(format!("HTTP POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BenchmarkError::Service(format!(
                "benchmark service returned HTTP status {status}"
            )));
        }

        let body = resp
            .json::<EvaluateResponse>()
            .map_err(|e| BenchmarkError::Protocol(format!("failed to parse JSON response: {e}")))?;

        Ok(body.score)
    }
}
