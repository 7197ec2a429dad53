//! Minimal demo wiring: constructs a handful of classic-PoW nodes,
//! connects them all-to-all, lets them run for a short fixed duration,
//! then reports each node's tip hash and chain length.
//!
//! The full simulation harness (CLI driver, peer topologies beyond
//! all-to-all, timed shutdown reporting CONSENSO/INCONSISTENCIA,
//! chain-diagram rendering) is an external collaborator, out of scope
//! for this crate.

use chain::block::{ClassicContext, ClassicMineContext, ClassicParams, ClassicScheme};
use chain::chain::Chain;
use chain::config::NodeConfig;
use chain::crypto::EcdsaWallet;
use chain::metrics::run_prometheus_http_server;
use chain::node::NodeEngine;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = NodeConfig::default();
    let difficulty = config.classic.difficulty;
    let stop_signal = Arc::new(AtomicBool::new(false));

    let node_count = 4;
    let mut nodes = Vec::with_capacity(node_count);
    for i in 0..node_count {
        let wallet = Arc::new(EcdsaWallet::generate());
        let chain = Chain::<ClassicScheme>::new(ClassicParams, ClassicContext { difficulty });
        let mut node_config = config.clone();
        if i == 0 {
            // Attacker model: node 0 runs far faster than its peers.
            node_config.mining.mining_speed = 4.0;
        } else {
            node_config.mining.mining_speed = 1.0;
        }
        let mine_ctx = ClassicMineContext {
            check_interval: node_config.mining.check_interval(),
            pause_duration: node_config.mining.pause_duration,
        };
        let node = NodeEngine::new(
            format!("Node-{i}"),
            chain,
            wallet,
            mine_ctx,
            Arc::clone(&stop_signal),
            node_config,
        );
        nodes.push(node);
    }

    for i in 0..node_count {
        for j in 0..node_count {
            if i == j {
                continue;
            }
            let peer_id = nodes[j].id.clone();
            let mailbox = nodes[j].inbox_sender();
            nodes[i].add_peer(peer_id, mailbox);
        }
    }

    // Each node owns its own Prometheus registry, so a multi-node demo
    // binds one exporter per node, one port apart from the configured
    // base address, rather than sharing a single combined registry.
    if config.metrics.enabled {
        let base_addr = config.metrics.listen_addr;
        for (i, node) in nodes.iter().enumerate() {
            let mut addr = base_addr;
            addr.set_port(base_addr.port() + i as u16);
            let registry = node.metrics().registry.clone();
            let node_id = node.id.clone();
            tokio::spawn(async move {
                if let Err(err) = run_prometheus_http_server(registry, addr).await {
                    tracing::error!(node = %node_id, %err, "metrics HTTP server error");
                }
            });
            tracing::info!(node = %node.id, %addr, "metrics exporter listening");
        }
    }

    for node in &nodes {
        node.start();
    }

    tokio::time::sleep(Duration::from_secs(10)).await;

    for node in &nodes {
        node.shutdown();
    }

    let mut tips = Vec::new();
    for node in &nodes {
        let tip = node.tip_hash();
        println!(
            "{} address={} chain_len={} mempool={} tip={}",
            node.id,
            node.address(),
            node.chain_len(),
            node.mempool_len(),
            tip
        );
        tips.push(tip);
    }

    let distinct: std::collections::HashSet<_> = tips.into_iter().collect();
    if distinct.len() == 1 {
        println!("CONSENSO");
    } else {
        println!("INCONSISTENCIA ({} distinct tips)", distinct.len());
    }
}
