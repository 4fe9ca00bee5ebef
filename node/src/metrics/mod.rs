//! Metrics and instrumentation for the node.
//!
//! Defines Prometheus-compatible metrics for mining, the chain, and
//! gossip, and exposes a small HTTP exporter that serves `/metrics` in
//! Prometheus text format.
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use sotamoon_node::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//! tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! registry.node.blocks_mined_total.inc();
//! ```

pub mod prometheus;

pub use prometheus::{MetricsRegistry, NodeMetrics, run_prometheus_http_server};
