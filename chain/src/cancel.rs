//! Cooperative cancellation token shared by the mining worker, the
//! solver it may delegate to, and the node's global `stop_signal`.
//!
//! A token observes two independent flags: its own per-task flag (set
//! by the block handler when a valid extension arrives, cancelling
//! only this mining attempt) and, when [`CancelToken::linked`] to a
//! node's global stop signal, that signal too — so a single checkpoint
//! check covers both per spec.md §4.6 ("check both the global
//! stop_signal and the per-task cancellation; if set, exit").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct CancelToken {
    task: Arc<AtomicBool>,
    global: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    /// A standalone token with no linked global signal.
    pub fn new() -> Self {
        CancelToken {
            task: Arc::new(AtomicBool::new(false)),
            global: None,
        }
    }

    /// A token whose `is_cancelled` also observes `global` (typically a
    /// node's `stop_signal`), independently of its own per-task flag.
    pub fn linked(global: Arc<AtomicBool>) -> Self {
        CancelToken {
            task: Arc::new(AtomicBool::new(false)),
            global: Some(global),
        }
    }

    /// Sets this token's own per-task flag; does not touch the linked
    /// global signal.
    pub fn cancel(&self) {
        self.task.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.load(Ordering::SeqCst)
            || self
                .global
                .as_ref()
                .is_some_and(|g| g.load(Ordering::SeqCst))
    }
}
