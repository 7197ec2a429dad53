//! Error taxonomy per the block/transaction validation contracts.
//!
//! `ValidationError` covers every reason a block can be rejected by the
//! block handler or by [`crate::chain::Chain::add_block`]; `TxError` is
//! the one hard, programmer-facing error raised by signing. Everything
//! else the spec calls "silent, logged, non-fatal" (`MailboxFull`,
//! `SolverFailure`) never becomes a `Result` variant — it is reported
//! via `tracing` at the call site instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block index/link does not extend the current tip")]
    LinkMismatch,
    #[error("block's puzzle predicate is not satisfied")]
    PuzzleUnsatisfied,
    #[error("block's recomputed final hash does not match its stored hash")]
    HashMismatch,
    #[error("an embedded transaction failed is_valid")]
    InternalTxInvalid,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("wallet address does not match the transaction sender")]
    WrongSigner,
}
