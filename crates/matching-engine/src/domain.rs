//! Order record and the small enums that describe its lifecycle.
//!
//! Mirrors the data model of a limit order book: an [`Order`] is created by
//! one of the four public operations, rests on the book (if it is a limit
//! order with `remaining > 0`), accumulates fills, and eventually reaches a
//! terminal status.

use common::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Dense, 1-based order identifier. `0` is the reserved "unassigned" id,
/// returned by [`crate::store::OrderStore::get`] for ids that were never
/// minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    pub const UNASSIGNED: OrderId = OrderId(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which book an order belongs to, or the synthetic sides used for orders
/// that were never meant to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
    MarketBuy,
    MarketSell,
}

impl Side {
    pub fn is_resting(&self) -> bool {
        matches!(self, Side::Bid | Side::Ask)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Open
    }
}

/// One leg of an order's append-only fill history. Summed, these equal
/// `amount - remaining` at any point in the order's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub book_filled: Amount,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub maker: Address,
    /// Limit price, scaled by `UNIT`. `0` only ever appears transiently on a
    /// market order before its VWAP is computed at closeout, or on the zero
    /// record returned for unassigned ids.
    pub price: Amount,
    pub amount: Amount,
    pub remaining: Amount,
    pub side: Side,
    pub status: OrderStatus,
    pub created_at: u64,
    pub closed_at: u64,
    pub fills: Vec<MatchRecord>,
}

impl Order {
    /// The well-defined zero record returned for ids that were never
    /// assigned. Every field reads as zero/empty; callers rely on this to
    /// distinguish "no such order" from a real order without a dedicated
    /// `Option`, matching the read-only accessors of the public surface.
    pub fn zero() -> Self {
        Self {
            id: OrderId::UNASSIGNED,
            maker: Address::ZERO,
            price: Amount::ZERO,
            amount: Amount::ZERO,
            remaining: Amount::ZERO,
            side: Side::Bid,
            status: OrderStatus::Open,
            created_at: 0,
            closed_at: 0,
            fills: Vec::new(),
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.maker.is_zero()
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_record_reads_as_empty() {
        let zero = Order::zero();
        assert!(zero.is_unassigned());
        assert_eq!(zero.remaining, Amount::ZERO);
        assert_eq!(zero.status, OrderStatus::Open);
    }

    #[test]
    fn order_id_display_matches_inner_value() {
        assert_eq!(OrderId(7).to_string(), "7");
        assert!(!OrderId::UNASSIGNED.is_assigned());
    }
}
