//! Dense `OrderId -> Order` storage, the per-user order index, and the
//! append-only match log — spec §4.1, unchanged in semantics.
//!
//! Replaces the teacher's `store/` submodule (`traits.rs` + `memory.rs` +
//! `redis.rs`): the single-writer model here has no multi-node persistence
//! story, so there is exactly one backend and no trait indirection over it.

use crate::domain::{MatchRecord, Order, OrderId, OrderStatus, Side};
use common::{Address, Amount};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Internal precondition violations. These are programmer errors reachable
/// only through [`crate::engine::MatchingEngine`]'s own bookkeeping (never
/// through the public operations, which validate ids before ever reaching
/// the store) — not part of the error surface spec §6 documents.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("order {0} is not open")]
    NotOpen(OrderId),
    #[error("fill of {fill} exceeds remaining {remaining} on order {id}")]
    FillExceedsRemaining {
        id: OrderId,
        fill: Amount,
        remaining: Amount,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Default)]
pub struct OrderStore {
    /// Dense, 1-based: `orders[i]` holds the order with id `i + 1`.
    orders: Vec<Order>,
    user_orders: HashMap<Address, Vec<OrderId>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next id, store an `Open` record with `remaining = amount`,
    /// append to the maker's order index, return the new id.
    pub fn create(&mut self, maker: Address, price: Amount, amount: Amount, side: Side, now: u64) -> OrderId {
        let id = OrderId(self.orders.len() as u64 + 1);
        self.orders.push(Order {
            id,
            maker,
            price,
            amount,
            remaining: amount,
            side,
            status: OrderStatus::Open,
            created_at: now,
            closed_at: 0,
            fills: Vec::new(),
        });
        self.user_orders.entry(maker).or_default().push(id);
        debug!(order_id = id.0, maker = %maker, %amount, "order created");
        id
    }

    /// Full record for `id`. Unknown or unassigned ids return the
    /// well-defined [`Order::zero`] record rather than an error.
    pub fn get(&self, id: OrderId) -> Order {
        if id.0 == 0 {
            return Order::zero();
        }
        self.orders
            .get(id.0 as usize - 1)
            .cloned()
            .unwrap_or_else(Order::zero)
    }

    fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        if id.0 == 0 {
            return None;
        }
        self.orders.get_mut(id.0 as usize - 1)
    }

    /// Decrement `remaining` by `book_filled`, append a match record, and
    /// transition to `Filled` if `remaining` reaches zero.
    pub fn record_fill(&mut self, id: OrderId, book_filled: Amount, now: u64) -> StoreResult<()> {
        let order = self.get_mut(id).ok_or(StoreError::FillExceedsRemaining {
            id,
            fill: book_filled,
            remaining: Amount::ZERO,
        })?;
        let remaining = order
            .remaining
            .checked_sub(book_filled)
            .ok_or(StoreError::FillExceedsRemaining {
                id,
                fill: book_filled,
                remaining: order.remaining,
            })?;
        order.remaining = remaining;
        order.fills.push(MatchRecord {
            book_filled,
            timestamp: now,
        });
        if remaining.is_zero() {
            order.status = OrderStatus::Filled;
            order.closed_at = now;
        }
        debug!(order_id = id.0, %book_filled, remaining = %remaining, "fill recorded");
        Ok(())
    }

    /// `Open -> Cancelled`. Fails if the order is not currently `Open`.
    pub fn cancel(&mut self, id: OrderId, now: u64) -> StoreResult<()> {
        let order = self.get_mut(id).ok_or(StoreError::NotOpen(id))?;
        if order.status != OrderStatus::Open {
            return Err(StoreError::NotOpen(id));
        }
        order.status = OrderStatus::Cancelled;
        order.closed_at = now;
        debug!(order_id = id.0, "order cancelled");
        Ok(())
    }

    /// Sets a market order's final VWAP price and closes it: any undrawn
    /// amount has already been handed off to a freshly created resting
    /// order, so the market order itself always concludes `Filled`.
    pub fn close_market_order(&mut self, id: OrderId, vwap_price: Amount, now: u64) {
        if let Some(order) = self.get_mut(id) {
            order.price = vwap_price;
            order.remaining = Amount::ZERO;
            order.status = OrderStatus::Filled;
            order.closed_at = now;
        }
    }

    /// Positional access into a user's order history, in insertion order.
    pub fn user_order_at(&self, maker: Address, index: usize) -> Option<OrderId> {
        self.user_orders.get(&maker).and_then(|ids| ids.get(index)).copied()
    }

    /// Number of orders ever created by `maker`, for bounds-checking
    /// positional reads.
    pub fn user_order_count(&self, maker: Address) -> usize {
        self.user_orders.get(&maker).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tag: u64) -> Address {
        Address::from_u64(tag)
    }

    #[test]
    fn create_assigns_dense_ids_from_one() {
        let mut store = OrderStore::new();
        let a = store.create(addr(1), Amount::new(1), Amount::new(10), Side::Bid, 100);
        let b = store.create(addr(1), Amount::new(1), Amount::new(10), Side::Bid, 100);
        assert_eq!(a, OrderId(1));
        assert_eq!(b, OrderId(2));
    }

    #[test]
    fn get_of_unassigned_id_is_the_zero_record() {
        let store = OrderStore::new();
        let zero = store.get(OrderId(0));
        assert!(zero.is_unassigned());
        let unassigned = store.get(OrderId(999));
        assert!(unassigned.is_unassigned());
    }

    #[test]
    fn record_fill_transitions_to_filled_at_zero_remaining() {
        let mut store = OrderStore::new();
        let id = store.create(addr(1), Amount::new(1), Amount::new(10), Side::Bid, 100);
        store.record_fill(id, Amount::new(6), 101).unwrap();
        assert_eq!(store.get(id).status, OrderStatus::Open);
        store.record_fill(id, Amount::new(4), 102).unwrap();
        let order = store.get(id);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.remaining, Amount::ZERO);
        assert_eq!(order.closed_at, 102);
        assert_eq!(
            order.fills.iter().map(|f| f.book_filled.0).sum::<u128>(),
            10
        );
    }

    #[test]
    fn record_fill_past_remaining_is_rejected() {
        let mut store = OrderStore::new();
        let id = store.create(addr(1), Amount::new(1), Amount::new(5), Side::Bid, 100);
        assert!(store.record_fill(id, Amount::new(6), 100).is_err());
    }

    #[test]
    fn cancel_requires_open_status() {
        let mut store = OrderStore::new();
        let id = store.create(addr(1), Amount::new(1), Amount::new(5), Side::Ask, 100);
        store.cancel(id, 101).unwrap();
        assert_eq!(store.get(id).status, OrderStatus::Cancelled);
        assert!(store.cancel(id, 102).is_err());
    }

    #[test]
    fn user_order_index_is_positional_and_insertion_ordered() {
        let mut store = OrderStore::new();
        let a = store.create(addr(1), Amount::new(1), Amount::new(5), Side::Bid, 100);
        let b = store.create(addr(1), Amount::new(2), Amount::new(5), Side::Ask, 100);
        assert_eq!(store.user_order_at(addr(1), 0), Some(a));
        assert_eq!(store.user_order_at(addr(1), 1), Some(b));
        assert_eq!(store.user_order_at(addr(1), 2), None);
    }
}
