//! Prometheus metrics for one node engine, plus a minimal `hyper`
//! `/metrics` exporter serving the registry's text encoding.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub struct NodeMetrics {
    pub registry: Registry,
    pub blocks_accepted_total: IntCounter,
    pub blocks_rejected_total: IntCounterVec,
    pub transactions_accepted_total: IntCounter,
    pub mempool_size: IntGauge,
    pub mining_attempts_total: IntCounter,
    pub mining_duration_seconds: Histogram,
}

impl NodeMetrics {
    pub fn new(node_id: &str) -> Self {
        let registry = Registry::new();

        let blocks_accepted_total = IntCounter::with_opts(
            Opts::new("blocks_accepted_total", "Blocks appended to the chain").const_label("node", node_id),
        )
        .expect("valid metric opts");
        let blocks_rejected_total = IntCounterVec::new(
            Opts::new("blocks_rejected_total", "Blocks dropped by validation reason").const_label("node", node_id),
            &["reason"],
        )
        .expect("valid metric opts");
        let transactions_accepted_total = IntCounter::with_opts(
            Opts::new("transactions_accepted_total", "Transactions admitted to the mempool")
                .const_label("node", node_id),
        )
        .expect("valid metric opts");
        let mempool_size = IntGauge::with_opts(
            Opts::new("mempool_size", "Current count of pending transactions").const_label("node", node_id),
        )
        .expect("valid metric opts");
        let mining_attempts_total = IntCounter::with_opts(
            Opts::new("mining_attempts_total", "Mining tasks started").const_label("node", node_id),
        )
        .expect("valid metric opts");
        let mining_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("mining_duration_seconds", "Wall-clock time spent per mining task")
                .const_label("node", node_id),
        )
        .expect("valid metric opts");

        registry
            .register(Box::new(blocks_accepted_total.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(blocks_rejected_total.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(transactions_accepted_total.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(mempool_size.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(mining_attempts_total.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(mining_duration_seconds.clone()))
            .expect("metric registers once");

        NodeMetrics {
            registry,
            blocks_accepted_total,
            blocks_rejected_total,
            transactions_accepted_total,
            mempool_size,
            mining_attempts_total,
            mining_duration_seconds,
        }
    }
}

async fn serve_metrics(
    registry: Registry,
    _req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("prometheus text encoding never fails on well-formed metrics");
    Ok(Response::new(Full::new(Bytes::from(buffer))))
}

/// Serves `registry`'s text encoding at `GET /metrics` on `addr` until
/// the returned task is dropped or the process exits.
pub async fn run_prometheus_http_server(registry: Registry, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "prometheus exporter listening");
    loop {
        let (stream, _peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let registry = registry.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| serve_metrics(registry.clone(), req));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!(%err, "prometheus connection closed with an error");
            }
        });
    }
}
