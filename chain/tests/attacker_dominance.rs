//! End-to-end scenario 2 (attacker dominance): `mining_speed` is the
//! only knob distinguishing an attacker from an honest peer, expressed
//! as the classic miner's `check_interval`/`pause_duration` split. This
//! exercises that knob directly rather than timing a full wall-clock
//! multi-node simulation, which is out of scope for this crate.

use chain::block::{Block, ClassicContext, ClassicMineContext, ClassicParams};
use chain::cancel::CancelToken;
use chain::crypto::Hash256;
use chain::PuzzleScheme;
use chain::ClassicScheme;
use std::time::{Duration, Instant};

fn run_once(ctx: &ClassicContext, mine_ctx: &ClassicMineContext) -> Duration {
    let mut candidate = Block::new_candidate(1, 1, Hash256::ZERO, "miner", Vec::new(), ClassicParams);
    let cancel = CancelToken::new();
    let started = Instant::now();
    assert!(ClassicScheme::mine(&mut candidate, ctx, mine_ctx, &cancel));
    started.elapsed()
}

#[test]
fn a_fast_miner_finds_a_block_well_before_a_throttled_peer() {
    // difficulty 2 (~256 expected nonces): cheap enough that even the
    // throttled miner's sleep-per-nonce run stays well under a few
    // seconds, but the gap between "no throttle" and "sleep every
    // nonce" is large enough to never be timing-noise.
    let ctx = ClassicContext { difficulty: 2 };

    // Never checkpoints (and so never sleeps) within this run's nonce
    // range: the node configured as the attacker via `mining_speed`.
    let fast = ClassicMineContext {
        check_interval: u64::MAX,
        pause_duration: Duration::from_millis(0),
    };
    // Checkpoints on every nonce and sleeps each time: an honest peer
    // throttled down by a small `mining_speed`.
    let slow = ClassicMineContext {
        check_interval: 1,
        pause_duration: Duration::from_millis(3),
    };

    let fast_elapsed = run_once(&ctx, &fast);
    let slow_elapsed = run_once(&ctx, &slow);

    assert!(
        fast_elapsed < slow_elapsed,
        "fast miner ({fast_elapsed:?}) should finish before the throttled one ({slow_elapsed:?})"
    );
}
