//! Asset ledger for the exchange
//!
//! spec.md delegates custody of the book asset and the price asset to two
//! external fungible-token ledgers exposing `transferFrom`, `transfer`, and
//! `balanceOf` with revert-on-failure semantics. This crate draws that
//! exact seam as a Rust trait, [`AssetLedger`], and ships an in-memory
//! double, [`InMemoryLedger`], that the matching engine's own tests and the
//! `exchanged` demo binary use in place of a real token contract.
//!
//! Rust has no implicit `msg.sender`: where the source contract's
//! `transferFrom(owner, receiver, amount)` and `transfer(receiver, amount)`
//! rely on the caller's identity, [`AssetLedger::transfer`] takes an
//! explicit `sender` instead. The matching engine always passes its own
//! address, so this is a transparent translation, not a semantic change.

pub mod error;

pub use error::LedgerError;

use common::{Address, Amount};
use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::debug;

/// Result type for asset ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// A fungible-token ledger for a single asset.
///
/// Implementations must revert (return `Err`) rather than partially apply
/// a transfer: spec.md §7 requires that a `LedgerFailure` leave every
/// balance untouched.
pub trait AssetLedger: Send + Sync {
    /// Move `amount` from `owner`'s balance to `receiver`'s balance.
    ///
    /// Analogous to the source token's `transferFrom(owner, receiver,
    /// amount)`; the caller is always the matching engine pulling an
    /// escrow from a participant.
    fn transfer_from(&self, owner: &Address, receiver: &Address, amount: Amount) -> Result<()>;

    /// Move `amount` from `sender`'s balance to `receiver`'s balance.
    ///
    /// Analogous to the source token's `transfer(receiver, amount)`, with
    /// `sender` standing in for the implicit caller — the matching engine
    /// always passes its own address here, releasing escrow it already
    /// holds.
    fn transfer(&self, sender: &Address, receiver: &Address, amount: Amount) -> Result<()>;

    /// Read `owner`'s current balance. Unknown accounts hold zero.
    fn balance_of(&self, owner: &Address) -> Amount;
}

/// An in-memory [`AssetLedger`] double.
///
/// Not a production token client — no allowances, no events, no on-chain
/// state. It exists so the matching engine (and anything that wires one
/// up, like `exchanged`) has something concrete to call through the
/// `AssetLedger` seam in tests and demos.
#[derive(Clone)]
pub struct InMemoryLedger {
    balances: Arc<RwLock<HashMap<Address, u128>>>,
}

impl InMemoryLedger {
    /// Create an empty ledger (every account starts at a zero balance).
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Credit `account` with `amount`, ignoring the revert-on-failure
    /// discipline real transfers observe — this is test/demo seeding, not
    /// a transfer between two parties.
    pub fn mint(&self, account: Address, amount: Amount) {
        let mut balances = self.balances.write();
        *balances.entry(account).or_insert(0) += amount.0;
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLedger for InMemoryLedger {
    fn transfer_from(&self, owner: &Address, receiver: &Address, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut balances = self.balances.write();
        let owner_balance = balances.get(owner).copied().unwrap_or(0);
        if owner_balance < amount.0 {
            debug!(%owner, %receiver, %amount, "transferFrom reverted: insufficient funds");
            return Err(LedgerError::InsufficientFunds);
        }
        *balances.entry(*owner).or_insert(0) -= amount.0;
        *balances.entry(*receiver).or_insert(0) += amount.0;
        Ok(())
    }

    fn transfer(&self, sender: &Address, receiver: &Address, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut balances = self.balances.write();
        let sender_balance = balances.get(sender).copied().unwrap_or(0);
        if sender_balance < amount.0 {
            return Err(LedgerError::Internal(format!(
                "sender {sender} holds {sender_balance} but tried to transfer {amount}"
            )));
        }
        *balances.entry(*sender).or_insert(0) -= amount.0;
        *balances.entry(*receiver).or_insert(0) += amount.0;
        Ok(())
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        Amount(self.balances.read().get(owner).copied().unwrap_or(0))
    }
}
