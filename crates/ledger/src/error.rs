//! Asset ledger error types

use thiserror::Error;

/// Errors that can occur during asset ledger operations.
///
/// Mirrors the revert-on-failure semantics spec.md requires from the two
/// external fungible-token ledgers: any failure here is meant to be
/// propagated verbatim by the matching engine, not translated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// `transferFrom` failed because the owner had insufficient balance, or
    /// (in a real token) insufficient allowance.
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// `transfer` failed because the ledger's own (engine-held) balance was
    /// insufficient to cover the requested amount — an internal
    /// inconsistency, since the engine should never hold less than what it
    /// has escrowed.
    #[error("Internal error: {0}")]
    Internal(String),
}
