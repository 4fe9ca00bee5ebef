//! Prometheus-backed metrics and HTTP exporter.
//!
//! Defines a [`MetricsRegistry`] that owns a Prometheus registry and a
//! set of strongly-typed node metrics, and an async HTTP exporter that
//! serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Mining, chain, and gossip metrics.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Blocks this node successfully mined and appended.
    pub blocks_mined_total: IntCounter,
    /// Wall-clock time spent inside a `MineTask`'s pipeline, in seconds.
    pub mine_duration_seconds: Histogram,
    /// Blocks received from peers and rejected by `Chain::verify_block`.
    pub blocks_rejected_total: IntCounter,
    /// Current chain length (block count).
    pub chain_length: Gauge,
    /// Current mempool size.
    pub mempool_size: Gauge,
    /// Successful longest-valid-chain replacements via `resolve_conflict`.
    pub fork_resolutions_total: IntCounter,
    /// Currently connected peers in the tracker's registry.
    pub peers_connected: Gauge,
    /// Gossip envelopes sent, by message type.
    pub gossip_sent_total: IntCounter,
    /// Gossip envelopes received, by message type.
    pub gossip_received_total: IntCounter,
}

impl NodeMetrics {
    /// Registers node metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let blocks_mined_total = IntCounter::with_opts(Opts::new(
            "blocks_mined_total",
            "Total number of blocks this node mined and appended",
        ))?;
        registry.register(Box::new(blocks_mined_total.clone()))?;

        let mine_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("mine_duration_seconds", "Duration of a MineTask pipeline run, in seconds")
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        )?;
        registry.register(Box::new(mine_duration_seconds.clone()))?;

        let blocks_rejected_total = IntCounter::with_opts(Opts::new(
            "blocks_rejected_total",
            "Total number of peer-proposed blocks rejected during verification",
        ))?;
        registry.register(Box::new(blocks_rejected_total.clone()))?;

        let chain_length = Gauge::with_opts(Opts::new("chain_length", "Current number of blocks in the local chain"))?;
        registry.register(Box::new(chain_length.clone()))?;

        let mempool_size = Gauge::with_opts(Opts::new("mempool_size", "Current number of unconfirmed transactions"))?;
        registry.register(Box::new(mempool_size.clone()))?;

        let fork_resolutions_total = IntCounter::with_opts(Opts::new(
            "fork_resolutions_total",
            "Total number of times resolve_conflict replaced the local chain",
        ))?;
        registry.register(Box::new(fork_resolutions_total.clone()))?;

        let peers_connected = Gauge::with_opts(Opts::new("peers_connected", "Current number of connected peers"))?;
        registry.register(Box::new(peers_connected.clone()))?;

        let gossip_sent_total =
            IntCounter::with_opts(Opts::new("gossip_sent_total", "Total gossip envelopes sent"))?;
        registry.register(Box::new(gossip_sent_total.clone()))?;

        let gossip_received_total =
            IntCounter::with_opts(Opts::new("gossip_received_total", "Total gossip envelopes received"))?;
        registry.register(Box::new(gossip_received_total.clone()))?;

        Ok(Self {
            blocks_mined_total,
            mine_duration_seconds,
            blocks_rejected_total,
            chain_length,
            mempool_size,
            fork_resolutions_total,
            peers_connected,
            gossip_sent_total,
            gossip_received_total,
        })
    }
}

/// Wrapper around a Prometheus registry and the node metrics.
///
/// This is the main handle passed around the node. It can be wrapped in
/// an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub node: NodeMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the node metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("sotamoon".to_string()), None)?;
        let node = NodeMetrics::register(&registry)?;
        Ok(Self { registry, node })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            eprintln!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                eprintln!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}
