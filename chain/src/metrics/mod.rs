//! Node-level observability: Prometheus counters/gauges/histograms and
//! an optional `/metrics` HTTP exporter, built the way the teacher's
//! own metrics module wires a `prometheus::Registry` up to `hyper`.

mod prometheus_exporter;

pub use prometheus_exporter::{run_prometheus_http_server, NodeMetrics};
