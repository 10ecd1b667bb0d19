//! The engine's public error surface — spec §6/§7, verbatim strings.
//!
//! Every variant here corresponds to exactly one precondition or ledger
//! failure a caller can observe. There are no machine-readable codes beyond
//! these messages, matching the wire-level contract the public operations
//! promise.

use ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchingError {
    #[error("Price must be greater than zero")]
    InvalidPrice,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Price must be less or equal than best ask price")]
    PriceAboveBestAsk,

    #[error("Price must be greater or equal than best bid price")]
    PriceBelowBestBid,

    #[error("No open asks")]
    NoOpenAsks,

    #[error("No open bids")]
    NoOpenBids,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Not order maker")]
    NotOrderMaker,

    #[error("Order not open")]
    OrderNotOpen,

    /// Propagated verbatim from the external asset ledger (spec §7
    /// `LedgerFailure`) — includes `LedgerError::InsufficientFunds`'s
    /// "Insufficient funds" message exactly as spec §6 names it.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Out-of-range positional read (spec §4.4).
    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}
