//! Node configuration: puzzle parameters, dispatcher probabilities,
//! mining-speed knobs and the metrics exporter, aggregated the way the
//! teacher's `ChainConfig` gathers its sub-configs.

use std::time::Duration;

/// Classic leading-zero PoW parameters.
#[derive(Clone, Debug)]
pub struct ClassicConfig {
    /// Required leading hex-zero count in a block's final hash.
    pub difficulty: usize,
}

impl Default for ClassicConfig {
    fn default() -> Self {
        ClassicConfig { difficulty: 4 }
    }
}

/// Graph Max-Cut PoW parameters.
#[derive(Clone, Debug)]
pub struct GraphConfig {
    /// Vertex count of the block-derived graph.
    pub graph_n: usize,
    /// Per-edge inclusion probability.
    pub graph_p: f64,
    /// Fraction of edges the partition must cut, in (0, 1].
    pub difficulty_ratio: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            graph_n: 14,
            graph_p: 0.5,
            difficulty_ratio: 0.58,
        }
    }
}

/// Classic-miner checkpoint/throttle knobs, kept as two independent
/// settings rather than overloading a single `mining_speed` value.
#[derive(Clone, Debug)]
pub struct MiningConfig {
    /// Per-node CPU throttle multiplier; the only knob used to
    /// demonstrate majority-hashrate dominance.
    pub mining_speed: f64,
    /// Base iteration count from which `check_interval` is derived:
    /// `check_interval = max(1, floor(base_check_iterations * mining_speed))`.
    pub base_check_iterations: u64,
    /// Fixed per-checkpoint sleep used to throttle a slow miner.
    pub pause_duration: Duration,
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            mining_speed: 1.0,
            base_check_iterations: 10_000,
            pause_duration: Duration::from_millis(1),
        }
    }
}

impl MiningConfig {
    pub fn check_interval(&self) -> u64 {
        let scaled = (self.base_check_iterations as f64 * self.mining_speed).floor();
        scaled.max(1.0) as u64
    }
}

/// Dispatcher loop probabilities and throttle range.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Probability of originating a new transaction when the mailbox
    /// is empty.
    pub p_tx: f64,
    /// Probability of attempting to start mining when the mailbox is
    /// empty (non-overlapping with `p_tx`: checked as `p_tx..p_tx+p_mine`).
    pub p_mine: f64,
    /// Lower/upper bound of the per-iteration throttle sleep.
    pub idle_sleep_range: (Duration, Duration),
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            p_tx: 0.10,
            p_mine: 0.30,
            idle_sleep_range: (Duration::from_millis(100), Duration::from_millis(500)),
        }
    }
}

/// Graph-PoW publish-wait barrier: deferral window before a locally
/// mined block is published, to avoid racing a concurrently arriving
/// block.
#[derive(Clone, Debug)]
pub struct PublishWaitConfig {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PublishWaitConfig {
    fn default() -> Self {
        PublishWaitConfig {
            attempts: 20,
            interval: Duration::from_millis(100),
        }
    }
}

/// Prometheus `/metrics` exporter settings. `listen_addr` is the base
/// address; a multi-node binary binds one node's exporter per port
/// starting here (see `main.rs`), since each node owns its own
/// registry rather than sharing one combined registry.
#[derive(Clone, Copy, Debug)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: std::net::SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            enabled: true,
            listen_addr: "127.0.0.1:9898"
                .parse()
                .expect("hard-coded metrics listen address should parse"),
        }
    }
}

/// Bounded-mailbox capacity shared by every peer inbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Aggregate configuration for one node engine.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub classic: ClassicConfig,
    pub graph: GraphConfig,
    pub mining: MiningConfig,
    pub dispatcher: DispatcherConfig,
    pub publish_wait: PublishWaitConfig,
    pub metrics: MetricsConfig,
    pub mailbox_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            classic: ClassicConfig::default(),
            graph: GraphConfig::default(),
            mining: MiningConfig::default(),
            dispatcher: DispatcherConfig::default(),
            publish_wait: PublishWaitConfig::default(),
            metrics: MetricsConfig::default(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}
