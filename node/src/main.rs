// src/main.rs
//
// The sotamoon node binary: wires up the library crate into a
// single-threaded I/O loop.
//
// - RocksDB-backed chain snapshot storage
// - content-addressed model cache (local + swarm)
// - an external benchmark service client
// - UDP gossip tracker with peer discovery
// - Prometheus metrics exporter on /metrics
// - a mining loop, while the chain is shorter than `--generate-blocks`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use sotamoon_node::chain::GENESIS_BENCHMARK_ID;
use sotamoon_node::discovery::{BluetoothSource, DnsSource, MdnsSource, ProviderNodeSource, StaticIpSource};
use sotamoon_node::provider::swarm::NoopSwarmSession;
use sotamoon_node::tracker::dispatch;
use sotamoon_node::{
    BenchmarkFactory, Chain, ChainStore, FileProvider, JointProvider, MetricsRegistry, Miner,
    NodeConfig, NodeSource, OpenedWallet, Provider, RocksDbChainStore, RocksDbConfig,
    SwarmProvider, Tracker, run_prometheus_http_server,
};

/// Current protocol version advertised in the `HANDSHAKE` message.
const NODE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "sotamoon-node", version, about = "A proof-of-useful-work node gated by ML benchmark improvement")]
struct Args {
    /// The number of blocks to generate. The node mines until the chain
    /// reaches this length, then stops; with the default of 1 (the
    /// genesis block alone) it never mines and only relays and
    /// validates gossip.
    #[arg(long, alias = "generate_blocks", default_value_t = 1)]
    generate_blocks: u32,

    /// Directory the content-addressed cache stores model artifacts and
    /// chain snapshots under.
    #[arg(long, default_value = "data/cache")]
    cache_dir: PathBuf,

    /// UDP port to listen on and advertise to peers.
    #[arg(long, default_value_t = sotamoon_node::DEFAULT_PORT)]
    listen_port: u16,

    /// Base URL of the external benchmark service.
    #[arg(long, default_value = "http://127.0.0.1:8090", env = "SOTAMOON_BENCHMARK_URL")]
    benchmark_url: String,

    /// Path to the RocksDB chain snapshot database.
    #[arg(long, default_value = "data/chain-db")]
    rocksdb_path: String,

    /// Address the Prometheus exporter binds to.
    #[arg(long, default_value = "127.0.0.1:9898")]
    metrics_addr: SocketAddr,

    /// Disables the Prometheus `/metrics` HTTP exporter.
    #[arg(long)]
    no_metrics: bool,

    /// Static peer IPs to dial at startup (paired with `--listen-port`).
    #[arg(long = "peer")]
    static_peers: Vec<String>,

    /// DNS hostnames to resolve for additional peers.
    #[arg(long = "dns-peer")]
    dns_peers: Vec<String>,

    /// Enables mDNS-based local peer discovery.
    #[arg(long)]
    mdns: bool,

    /// Enables Bluetooth-based peer discovery (Linux only).
    #[arg(long)]
    bluetooth: bool,

    /// Log filter, forwarded to `tracing_subscriber::EnvFilter`.
    #[arg(long, default_value = "sotamoon_node=info")]
    log: String,
}

impl Args {
    fn into_config(self) -> NodeConfig {
        let mut cfg = NodeConfig::default();
        cfg.generate_blocks = self.generate_blocks;
        cfg.cache_dir = self.cache_dir;
        cfg.benchmark.base_url = self.benchmark_url;
        cfg.storage = RocksDbConfig {
            path: self.rocksdb_path,
            create_if_missing: true,
        };
        cfg.metrics.enabled = !self.no_metrics;
        cfg.metrics.listen_addr = self.metrics_addr;
        cfg.protocol.listen_addr = format!("0.0.0.0:{}", self.listen_port)
            .parse()
            .expect("listen_port is a valid u16");
        cfg.protocol.advertised_port = self.listen_port;
        cfg.discovery.static_addresses = self.static_peers;
        cfg.discovery.dns_hostnames = self.dns_peers;
        cfg.discovery.mdns_enabled = self.mdns;
        cfg.discovery.bluetooth_enabled = self.bluetooth;
        cfg
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| args.log.clone()))
        .init();

    let cfg = args.into_config();
    if let Err(err) = run_node(cfg).await {
        tracing::error!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run_node(cfg: NodeConfig) -> Result<(), String> {
    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::warn!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Content-addressed provider
    // ---------------------------

    std::fs::create_dir_all(&cfg.cache_dir)
        .map_err(|e| format!("failed to create cache dir {}: {e}", cfg.cache_dir.display()))?;

    let provider: Arc<dyn Provider> = Arc::new(JointProvider::new(vec![
        Box::new(FileProvider::new(cfg.cache_dir.clone())),
        Box::new(SwarmProvider::new(cfg.cache_dir.clone(), Box::new(NoopSwarmSession))),
    ]));

    // ---------------------------
    // Benchmark service client
    // ---------------------------

    let benchmark_factory = Arc::new(BenchmarkFactory::with_default_registry(
        cfg.benchmark.base_url.clone(),
        cfg.benchmark.timeout,
    ));

    // ---------------------------
    // Chain snapshot storage + chain
    // ---------------------------

    let mut store = RocksDbChainStore::open(&cfg.storage)
        .map_err(|e| format!("failed to open RocksDB store at {}: {e:?}", cfg.storage.path))?;

    // In a production deployment this would come from a persisted
    // keypair file; a fresh wallet is generated each run for this demo
    // binary.
    let wallet = OpenedWallet::generate();

    let mut chain = match store.load() {
        Some(blocks) => {
            tracing::info!(blocks = blocks.len(), "restored chain from RocksDB");
            Chain::from_blocks(blocks, Arc::clone(&provider), Arc::clone(&benchmark_factory))
        }
        None => {
            tracing::info!("no persisted chain found, starting from genesis");
            Chain::genesis(wallet.public(), Arc::clone(&provider), Arc::clone(&benchmark_factory))
        }
    };
    store.save(chain.blocks());
    metrics.node.chain_length.set(chain.len() as f64);

    // ---------------------------
    // Miner
    // ---------------------------

    let mut miner = Miner::new(wallet, Arc::clone(&provider), Arc::clone(&benchmark_factory));

    if chain.len() < cfg.generate_blocks as usize {
        let last_block = chain.last_block().clone();
        let target = chain
            .last_benchmark_block(GENESIS_BENCHMARK_ID)
            .unwrap_or(&last_block)
            .clone();
        miner.mine(&last_block, &target).await;
    }

    // ---------------------------
    // Discovery + tracker
    // ---------------------------

    let mut sources: Vec<Box<dyn NodeSource>> = Vec::new();
    if !cfg.discovery.static_addresses.is_empty() {
        sources.push(Box::new(StaticIpSource::new(cfg.discovery.static_addresses.clone())));
    }
    if !cfg.discovery.dns_hostnames.is_empty() {
        match DnsSource::new(cfg.discovery.dns_hostnames.clone()) {
            Ok(dns) => sources.push(Box::new(dns)),
            Err(e) => tracing::warn!("failed to build DNS discovery source: {e}"),
        }
    }
    if cfg.discovery.mdns_enabled {
        sources.push(Box::new(MdnsSource::default()));
    }
    if cfg.discovery.bluetooth_enabled {
        sources.push(Box::new(BluetoothSource));
    }
    sources.push(Box::new(ProviderNodeSource::new(Arc::clone(&provider))));

    let mut tracker = Tracker::bind(cfg.protocol.listen_addr, cfg.protocol.advertised_port, sources)
        .await
        .map_err(|e| format!("failed to bind tracker on {}: {e}", cfg.protocol.listen_addr))?;

    tracing::info!(
        listen_addr = %cfg.protocol.listen_addr,
        generate_blocks = cfg.generate_blocks,
        chain_length = chain.len(),
        "sotamoon node starting"
    );

    let mut discovery_tick = tokio::time::interval(Duration::from_secs(cfg.discovery.interval_secs.max(1)));
    let mut poll_tick = tokio::time::interval(Duration::from_millis(500));

    // ---------------------------
    // Main I/O loop
    // ---------------------------

    loop {
        tokio::select! {
            result = tracker.recv() => {
                match result {
                    Ok((from, envelope, is_response)) => {
                        metrics.node.gossip_received_total.inc();
                        if is_response {
                            dispatch::handle_response(&envelope, &mut tracker, &mut chain, &mut miner);
                            store.save(chain.blocks());
                            metrics.node.chain_length.set(chain.len() as f64);
                        } else {
                            let payload = dispatch::handle_request(&envelope, &tracker, &chain, &mut miner, NODE_VERSION);
                            let response = envelope.response_to(payload);
                            if let Err(e) = tracker.send_response(&from, &response).await {
                                tracing::warn!("failed to send response to {from}: {e}");
                            } else {
                                metrics.node.gossip_sent_total.inc();
                            }
                        }
                        metrics.node.mempool_size.set(miner.mempool().len() as f64);
                    }
                    Err(e) => tracing::warn!("tracker recv error: {e}"),
                }
            }

            _ = discovery_tick.tick() => {
                let admitted = tracker.discover();
                if !admitted.is_empty() {
                    tracing::info!(count = admitted.len(), "discovered new peers");
                }
                metrics.node.peers_connected.set(tracker.connected_nodes().len() as f64);
            }

            _ = poll_tick.tick() => {
                if let Some(outcome) = miner.poll_completed() {
                    match outcome {
                        Ok(proof) => {
                            let score = proof.completion;
                            match miner.finalize_mine(proof, &mut chain) {
                                Ok(()) => {
                                    tracing::info!(score, height = chain.len(), "mined and appended a new block");
                                    metrics.node.blocks_mined_total.inc();
                                    metrics.node.chain_length.set(chain.len() as f64);
                                    store.save(chain.blocks());
                                }
                                Err(e) => tracing::warn!("failed to finalise mined block: {e}"),
                            }
                        }
                        Err(e) => tracing::warn!("mine task ended without a proof: {e}"),
                    }

                    if chain.len() < cfg.generate_blocks as usize {
                        let last_block = chain.last_block().clone();
                        let target = chain
                            .last_benchmark_block(GENESIS_BENCHMARK_ID)
                            .unwrap_or(&last_block)
                            .clone();
                        miner.mine(&last_block, &target).await;
                    }
                }
            }
        }
    }
}
