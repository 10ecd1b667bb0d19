//! The algorithmic core: price-time priority matching for limit and market
//! orders, with partial and crossing fills — spec §4.3, unchanged.
//!
//! Every public operation here follows checks-effects-interactions (spec
//! §5): `OrderStore`/`PriceLevelIndex` mutations for a given fill are
//! written before the asset transfers that fill implies are issued, so a
//! reentrant call from inside `AssetLedger::transfer`/`transfer_from` would
//! observe a consistent book. The one exception is spec's own: the escrow
//! pull in step 2 of `addBid`/`addAsk` (and the speculative pull in
//! `marketBuy`/`marketSell`) necessarily precedes the crossing loop,
//! because the loop needs the order to already exist and the funds to
//! already be escrowed. This is spec's own ordering, not a deviation.

use crate::book::{BookSide, PriceLevelIndex};
use crate::domain::{Order, OrderId, OrderStatus, Side};
use crate::error::MatchingError;
use crate::event::{EventLog, MatchingEvent};
use crate::metrics::{self, MatchLatencyGuard};
use crate::store::OrderStore;
use common::{Address, Amount, UNIT};
use ledger::AssetLedger;
use std::sync::Arc;
use tracing::instrument;

fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// The matching engine for a single `(bookAsset, priceAsset)` pair.
///
/// Holds its own identity (`engine_address`) for escrow bookkeeping: every
/// pulled balance sits at this address in the external ledgers until it is
/// paid out on a fill or refunded on cancel.
pub struct MatchingEngine {
    engine_address: Address,
    book_ledger: Arc<dyn AssetLedger>,
    price_ledger: Arc<dyn AssetLedger>,
    store: OrderStore,
    index: PriceLevelIndex,
    market_price: Amount,
    events: EventLog,
}

impl MatchingEngine {
    pub fn new(
        engine_address: Address,
        book_ledger: Arc<dyn AssetLedger>,
        price_ledger: Arc<dyn AssetLedger>,
    ) -> Self {
        Self {
            engine_address,
            book_ledger,
            price_ledger,
            store: OrderStore::new(),
            index: PriceLevelIndex::new(),
            market_price: Amount::ZERO,
            events: EventLog::new(),
        }
    }

    // ------------------------------------------------------------------
    // Read-only surface (spec §4.4)
    // ------------------------------------------------------------------

    pub fn best_bid_price(&self) -> Amount {
        self.index.best_price(BookSide::Bid)
    }

    pub fn best_ask_price(&self) -> Amount {
        self.index.best_price(BookSide::Ask)
    }

    pub fn market_price(&self) -> Amount {
        self.market_price
    }

    /// Full record for `id`; the zero record for unknown ids.
    pub fn order(&self, id: OrderId) -> Order {
        self.store.get(id)
    }

    pub fn user_order_at(&self, maker: Address, index: usize) -> Result<OrderId, MatchingError> {
        self.store
            .user_order_at(maker, index)
            .ok_or(MatchingError::IndexOutOfRange {
                index,
                len: self.store.user_order_count(maker),
            })
    }

    pub fn open_bids_stack_at(&self, index: usize) -> Result<Amount, MatchingError> {
        self.index
            .stack_at(BookSide::Bid, index)
            .ok_or(MatchingError::IndexOutOfRange {
                index,
                len: self.index.stack_len(BookSide::Bid),
            })
    }

    pub fn open_asks_stack_at(&self, index: usize) -> Result<Amount, MatchingError> {
        self.index
            .stack_at(BookSide::Ask, index)
            .ok_or(MatchingError::IndexOutOfRange {
                index,
                len: self.index.stack_len(BookSide::Ask),
            })
    }

    pub fn price_open_bids_at(&self, price: Amount, index: usize) -> Result<OrderId, MatchingError> {
        self.index
            .queue_entry_at(BookSide::Bid, price, index)
            .ok_or(MatchingError::IndexOutOfRange {
                index,
                len: self.index.queue_len(BookSide::Bid, price),
            })
    }

    pub fn price_open_asks_at(&self, price: Amount, index: usize) -> Result<OrderId, MatchingError> {
        self.index
            .queue_entry_at(BookSide::Ask, price, index)
            .ok_or(MatchingError::IndexOutOfRange {
                index,
                len: self.index.queue_len(BookSide::Ask, price),
            })
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    // ------------------------------------------------------------------
    // Mutating operations (spec §4.3)
    // ------------------------------------------------------------------

    /// `addBid(price, amount, from)` — spec §4.3.1.
    #[instrument(skip(self), fields(%maker, %price, %amount))]
    pub fn add_bid(&mut self, maker: Address, price: Amount, amount: Amount) -> Result<OrderId, MatchingError> {
        let _latency = MatchLatencyGuard::start();
        metrics::record_order_received();

        if price.is_zero() {
            return Err(MatchingError::InvalidPrice);
        }
        if amount.is_zero() {
            return Err(MatchingError::InvalidAmount);
        }
        if price > self.best_ask_price() {
            return Err(MatchingError::PriceAboveBestAsk);
        }

        let now = now();
        let cost = amount.scale_by_price(price).expect("escrow cost overflow");
        self.price_ledger.transfer_from(&maker, &self.engine_address, cost)?;

        let order_id = self.store.create(maker, price, amount, Side::Bid, now);
        self.events.push(MatchingEvent::OrderAccepted { order_id, maker });

        let mut remaining = amount;
        while !remaining.is_zero() && self.best_ask_price() <= price {
            let ask_price = self.best_ask_price();
            let ask_id = self.front_of(BookSide::Ask, ask_price);
            let ask = self.store.get(ask_id);
            let fill = remaining.min(ask.remaining);

            self.store.record_fill(order_id, fill, now).expect("bid fill within remaining");
            self.store.record_fill(ask_id, fill, now).expect("ask fill within remaining");
            if self.store.get(ask_id).remaining.is_zero() {
                self.index.dequeue_head(BookSide::Ask, ask_price);
            }

            let proceeds = fill.scale_by_price(ask_price).expect("proceeds overflow");
            let surplus = if price > ask_price {
                let diff = price.checked_sub(ask_price).expect("price >= ask_price");
                fill.scale_by_price(diff).expect("surplus overflow")
            } else {
                Amount::ZERO
            };

            self.book_ledger.transfer(&self.engine_address, &maker, fill)?;
            self.price_ledger.transfer(&self.engine_address, &ask.maker, proceeds)?;
            if !surplus.is_zero() {
                self.price_ledger.transfer(&self.engine_address, &maker, surplus)?;
            }

            self.events.push(MatchingEvent::Trade {
                taker_id: order_id,
                maker_id: ask_id,
                price: ask_price,
                book_filled: fill,
            });
            metrics::record_trade();

            self.market_price = ask_price;
            remaining = remaining.checked_sub(fill).expect("remaining underflow");
        }

        if !remaining.is_zero() {
            self.index.enqueue(BookSide::Bid, price, order_id);
        }

        Ok(order_id)
    }

    /// `addAsk(price, amount, from)` — spec §4.3.2, symmetric to `add_bid`.
    #[instrument(skip(self), fields(%maker, %price, %amount))]
    pub fn add_ask(&mut self, maker: Address, price: Amount, amount: Amount) -> Result<OrderId, MatchingError> {
        let _latency = MatchLatencyGuard::start();
        metrics::record_order_received();

        if price.is_zero() {
            return Err(MatchingError::InvalidPrice);
        }
        if amount.is_zero() {
            return Err(MatchingError::InvalidAmount);
        }
        if price < self.best_bid_price() {
            return Err(MatchingError::PriceBelowBestBid);
        }

        let now = now();
        self.book_ledger.transfer_from(&maker, &self.engine_address, amount)?;

        let order_id = self.store.create(maker, price, amount, Side::Ask, now);
        self.events.push(MatchingEvent::OrderAccepted { order_id, maker });

        let mut remaining = amount;
        while !remaining.is_zero() && self.best_bid_price() >= price {
            let bid_price = self.best_bid_price();
            let bid_id = self.front_of(BookSide::Bid, bid_price);
            let bid = self.store.get(bid_id);
            let fill = remaining.min(bid.remaining);

            self.store.record_fill(order_id, fill, now).expect("ask fill within remaining");
            self.store.record_fill(bid_id, fill, now).expect("bid fill within remaining");
            if self.store.get(bid_id).remaining.is_zero() {
                self.index.dequeue_head(BookSide::Bid, bid_price);
            }

            // Paid at the resting bid's price, the maker's price, not the
            // incoming ask's limit — no surplus to refund on this side.
            let proceeds = fill.scale_by_price(bid_price).expect("proceeds overflow");

            self.price_ledger.transfer(&self.engine_address, &maker, proceeds)?;
            self.book_ledger.transfer(&self.engine_address, &bid.maker, fill)?;

            self.events.push(MatchingEvent::Trade {
                taker_id: order_id,
                maker_id: bid_id,
                price: bid_price,
                book_filled: fill,
            });
            metrics::record_trade();

            self.market_price = bid_price;
            remaining = remaining.checked_sub(fill).expect("remaining underflow");
        }

        if !remaining.is_zero() {
            self.index.enqueue(BookSide::Ask, price, order_id);
        }

        Ok(order_id)
    }

    /// `marketBuy(amount, from)` — spec §4.3.3.
    #[instrument(skip(self), fields(%buyer, %amount))]
    pub fn market_buy(&mut self, buyer: Address, amount: Amount) -> Result<OrderId, MatchingError> {
        let _latency = MatchLatencyGuard::start();
        metrics::record_order_received();

        if amount.is_zero() {
            return Err(MatchingError::InvalidAmount);
        }
        if self.best_ask_price() == Amount::MAX {
            return Err(MatchingError::NoOpenAsks);
        }

        let now = now();
        let (available, matched_cost, last_price) = self.speculative_walk(BookSide::Ask, amount);
        let residual = amount.checked_sub(available).expect("available never exceeds amount");
        let residual_escrow = if residual.is_zero() {
            Amount::ZERO
        } else {
            residual.scale_by_price(last_price).expect("residual escrow overflow")
        };
        let total_cost = matched_cost
            .checked_add(residual_escrow)
            .expect("total cost overflow");
        self.price_ledger.transfer_from(&buyer, &self.engine_address, total_cost)?;

        let order_id = self.store.create(buyer, Amount::ZERO, amount, Side::MarketBuy, now);
        self.events.push(MatchingEvent::OrderAccepted { order_id, maker: buyer });

        let mut remaining = amount;
        let mut total_paid = Amount::ZERO;
        let mut last_traversed = Amount::ZERO;
        while !remaining.is_zero() && self.best_ask_price() != Amount::MAX {
            let ask_price = self.best_ask_price();
            let ask_id = self.front_of(BookSide::Ask, ask_price);
            let ask = self.store.get(ask_id);
            let fill = remaining.min(ask.remaining);

            self.store.record_fill(order_id, fill, now).expect("market buy fill within remaining");
            self.store.record_fill(ask_id, fill, now).expect("ask fill within remaining");
            if self.store.get(ask_id).remaining.is_zero() {
                self.index.dequeue_head(BookSide::Ask, ask_price);
            }

            let proceeds = fill.scale_by_price(ask_price).expect("proceeds overflow");
            self.book_ledger.transfer(&self.engine_address, &buyer, fill)?;
            self.price_ledger.transfer(&self.engine_address, &ask.maker, proceeds)?;

            self.events.push(MatchingEvent::Trade {
                taker_id: order_id,
                maker_id: ask_id,
                price: ask_price,
                book_filled: fill,
            });
            metrics::record_trade();

            self.market_price = ask_price;
            total_paid = total_paid.checked_add(proceeds).expect("total paid overflow");
            last_traversed = ask_price;
            remaining = remaining.checked_sub(fill).expect("remaining underflow");
        }

        let vwap = if total_paid.is_zero() {
            Amount::ZERO
        } else {
            let book_filled = amount.checked_sub(remaining).expect("book_filled underflow");
            Amount::new(
                total_paid
                    .0
                    .checked_mul(UNIT)
                    .expect("vwap numerator overflow")
                    / book_filled.0,
            )
        };
        self.store.close_market_order(order_id, vwap, now);

        if !remaining.is_zero() {
            // Residual rests as a synthetic Bid at the last price traversed
            // (spec §9); its escrow was already pulled above as part of
            // `total_cost`.
            let residual_id = self.store.create(buyer, last_traversed, remaining, Side::Bid, now);
            self.events.push(MatchingEvent::OrderAccepted {
                order_id: residual_id,
                maker: buyer,
            });
            self.index.enqueue(BookSide::Bid, last_traversed, residual_id);
        }

        Ok(order_id)
    }

    /// `marketSell(amount, from)` — spec §4.3.4, symmetric to `market_buy`.
    #[instrument(skip(self), fields(%seller, %amount))]
    pub fn market_sell(&mut self, seller: Address, amount: Amount) -> Result<OrderId, MatchingError> {
        let _latency = MatchLatencyGuard::start();
        metrics::record_order_received();

        if amount.is_zero() {
            return Err(MatchingError::InvalidAmount);
        }
        if self.best_bid_price() == Amount::ZERO {
            return Err(MatchingError::NoOpenBids);
        }

        let now = now();
        self.book_ledger.transfer_from(&seller, &self.engine_address, amount)?;

        let order_id = self.store.create(seller, Amount::ZERO, amount, Side::MarketSell, now);
        self.events.push(MatchingEvent::OrderAccepted { order_id, maker: seller });

        let mut remaining = amount;
        let mut total_paid = Amount::ZERO;
        let mut last_traversed = Amount::ZERO;
        while !remaining.is_zero() && self.best_bid_price() != Amount::ZERO {
            let bid_price = self.best_bid_price();
            let bid_id = self.front_of(BookSide::Bid, bid_price);
            let bid = self.store.get(bid_id);
            let fill = remaining.min(bid.remaining);

            self.store.record_fill(order_id, fill, now).expect("market sell fill within remaining");
            self.store.record_fill(bid_id, fill, now).expect("bid fill within remaining");
            if self.store.get(bid_id).remaining.is_zero() {
                self.index.dequeue_head(BookSide::Bid, bid_price);
            }

            let proceeds = fill.scale_by_price(bid_price).expect("proceeds overflow");
            self.price_ledger.transfer(&self.engine_address, &seller, proceeds)?;
            self.book_ledger.transfer(&self.engine_address, &bid.maker, fill)?;

            self.events.push(MatchingEvent::Trade {
                taker_id: order_id,
                maker_id: bid_id,
                price: bid_price,
                book_filled: fill,
            });
            metrics::record_trade();

            self.market_price = bid_price;
            total_paid = total_paid.checked_add(proceeds).expect("total paid overflow");
            last_traversed = bid_price;
            remaining = remaining.checked_sub(fill).expect("remaining underflow");
        }

        let vwap = if total_paid.is_zero() {
            Amount::ZERO
        } else {
            let book_filled = amount.checked_sub(remaining).expect("book_filled underflow");
            Amount::new(
                total_paid
                    .0
                    .checked_mul(UNIT)
                    .expect("vwap numerator overflow")
                    / book_filled.0,
            )
        };
        self.store.close_market_order(order_id, vwap, now);

        if !remaining.is_zero() {
            let residual_id = self.store.create(seller, last_traversed, remaining, Side::Ask, now);
            self.events.push(MatchingEvent::OrderAccepted {
                order_id: residual_id,
                maker: seller,
            });
            self.index.enqueue(BookSide::Ask, last_traversed, residual_id);
        }

        Ok(order_id)
    }

    /// `cancelOrder(id, from)` — spec §4.3.5.
    #[instrument(skip(self), fields(%caller, order_id = id.0))]
    pub fn cancel_order(&mut self, caller: Address, id: OrderId) -> Result<(), MatchingError> {
        let order = self.store.get(id);
        if order.is_unassigned() {
            return Err(MatchingError::OrderNotFound);
        }
        if order.maker != caller {
            return Err(MatchingError::NotOrderMaker);
        }
        if order.status != OrderStatus::Open {
            return Err(MatchingError::OrderNotOpen);
        }

        let now = now();
        let side = match order.side {
            Side::Bid => BookSide::Bid,
            Side::Ask => BookSide::Ask,
            Side::MarketBuy | Side::MarketSell => {
                unreachable!("market orders never rest Open on the book")
            }
        };
        self.index.remove_by_id(side, order.price, id);
        self.store.cancel(id, now).expect("status checked Open above");
        self.events.push(MatchingEvent::OrderCancelled { order_id: id });

        match side {
            BookSide::Ask => {
                self.book_ledger.transfer(&self.engine_address, &order.maker, order.remaining)?;
            }
            BookSide::Bid => {
                let refund = order
                    .remaining
                    .scale_by_price(order.price)
                    .expect("refund overflow");
                self.price_ledger.transfer(&self.engine_address, &order.maker, refund)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn front_of(&self, side: BookSide, price: Amount) -> OrderId {
        self.index
            .queue_at(side, price)
            .and_then(|q| q.front().copied())
            .expect("best price on a side always has a non-empty queue")
    }

    /// Read-only walk from the best price on `side` consuming up to `need`
    /// book units, without mutating anything. Returns `(book units actually
    /// available, price-asset cost of those units, last price visited)`.
    /// Used by `market_buy`/`market_sell` to size the upfront escrow pull
    /// before any state mutation begins.
    fn speculative_walk(&self, side: BookSide, mut need: Amount) -> (Amount, Amount, Amount) {
        let mut book_filled = Amount::ZERO;
        let mut cost = Amount::ZERO;
        let mut last_price = Amount::ZERO;
        'outer: for &price in self.index.stack_view(side).iter().rev() {
            let Some(queue) = self.index.queue_at(side, price) else {
                continue;
            };
            for &order_id in queue {
                if need.is_zero() {
                    break 'outer;
                }
                let order = self.store.get(order_id);
                let take = need.min(order.remaining);
                book_filled = book_filled.checked_add(take).expect("book_filled overflow");
                let leg_cost = take.scale_by_price(price).expect("leg cost overflow");
                cost = cost.checked_add(leg_cost).expect("cost overflow");
                need = need.checked_sub(take).expect("need underflow");
                last_price = price;
            }
        }
        (book_filled, cost, last_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::InMemoryLedger;

    const SUPPLY: u128 = 1_000 * UNIT;

    fn unit(n: u128) -> Amount {
        Amount::new(n * UNIT)
    }

    struct Harness {
        engine: MatchingEngine,
        book: InMemoryLedger,
        price: InMemoryLedger,
    }

    fn setup() -> Harness {
        let book = InMemoryLedger::new();
        let price = InMemoryLedger::new();
        let engine_address = Address::from_u64(999);
        let engine = MatchingEngine::new(
            engine_address,
            Arc::new(book.clone()),
            Arc::new(price.clone()),
        );
        Harness { engine, book, price }
    }

    fn fund(harness: &Harness, who: Address) {
        harness.book.mint(who, Amount::new(SUPPLY));
        harness.price.mint(who, Amount::new(SUPPLY));
    }

    #[test]
    fn single_resting_bid() {
        let mut h = setup();
        let a = Address::from_u64(1);
        fund(&h, a);

        let id = h.engine.add_bid(a, unit(1), unit(10)).unwrap();

        assert_eq!(h.price.balance_of(&Address::from_u64(999)), unit(10));
        assert_eq!(h.price.balance_of(&a), Amount::new(SUPPLY) .checked_sub(unit(10)).unwrap());
        assert_eq!(h.engine.open_bids_stack_at(0).unwrap(), unit(1));
        assert_eq!(h.engine.best_bid_price(), unit(1));
        let order = h.engine.order(id);
        assert_eq!(order.remaining, unit(10));
        assert_eq!(order.status, OrderStatus::Open);
    }

    #[test]
    fn full_crossing_complete() {
        let mut h = setup();
        let a = Address::from_u64(1);
        let b = Address::from_u64(2);
        fund(&h, a);
        fund(&h, b);

        let bid_id = h.engine.add_bid(a, unit(1), unit(10)).unwrap();
        let ask_id = h.engine.add_ask(b, unit(1), unit(10)).unwrap();

        assert_eq!(h.engine.order(bid_id).status, OrderStatus::Filled);
        assert_eq!(h.engine.order(ask_id).status, OrderStatus::Filled);
        assert_eq!(h.price.balance_of(&Address::from_u64(999)), Amount::ZERO);
        assert_eq!(h.book.balance_of(&Address::from_u64(999)), Amount::ZERO);
        assert_eq!(h.book.balance_of(&a), Amount::new(SUPPLY).checked_add(unit(10)).unwrap());
        assert_eq!(h.price.balance_of(&b), Amount::new(SUPPLY).checked_add(unit(10)).unwrap());
        assert_eq!(h.engine.best_bid_price(), Amount::ZERO);
        assert_eq!(h.engine.best_ask_price(), Amount::MAX);
        assert_eq!(h.engine.market_price(), unit(1));
    }

    #[test]
    fn partial_resting_bid() {
        let mut h = setup();
        let a = Address::from_u64(1);
        let b = Address::from_u64(2);
        fund(&h, a);
        fund(&h, b);

        let bid_id = h.engine.add_bid(a, unit(1), unit(10)).unwrap();
        h.engine.add_ask(b, unit(1), unit(7)).unwrap();

        let bid = h.engine.order(bid_id);
        assert_eq!(bid.remaining, unit(3));
        assert_eq!(bid.status, OrderStatus::Open);
        assert_eq!(h.engine.open_bids_stack_at(0).unwrap(), unit(1));
        assert_eq!(h.price.balance_of(&Address::from_u64(999)), unit(3));
        assert_eq!(h.engine.market_price(), unit(1));
    }

    #[test]
    fn multi_level_market_buy() {
        let mut h = setup();
        let asker = Address::from_u64(1);
        let buyer = Address::from_u64(2);
        fund(&h, asker);
        fund(&h, buyer);

        h.engine.add_ask(asker, unit(1), unit(10)).unwrap();
        h.engine.add_ask(asker, unit(3), unit(10)).unwrap();
        h.engine.add_ask(asker, unit(2), unit(10)).unwrap();

        assert_eq!(h.engine.open_asks_stack_at(0).unwrap(), unit(3));
        assert_eq!(h.engine.open_asks_stack_at(1).unwrap(), unit(2));
        assert_eq!(h.engine.open_asks_stack_at(2).unwrap(), unit(1));
        assert_eq!(h.engine.best_ask_price(), unit(1));

        let order_id = h.engine.market_buy(buyer, unit(30)).unwrap();

        assert_eq!(h.engine.order(order_id).status, OrderStatus::Filled);
        assert_eq!(h.engine.market_price(), unit(3));
        assert_eq!(h.engine.best_ask_price(), Amount::MAX);
        assert_eq!(h.engine.best_bid_price(), Amount::ZERO);
        assert_eq!(
            h.price.balance_of(&asker),
            Amount::new(SUPPLY).checked_add(unit(60)).unwrap()
        );
        assert_eq!(
            h.book.balance_of(&buyer),
            Amount::new(SUPPLY).checked_add(unit(30)).unwrap()
        );
    }

    #[test]
    fn market_buy_overshoot_residual_rests() {
        let mut h = setup();
        let asker = Address::from_u64(1);
        let buyer = Address::from_u64(2);
        fund(&h, asker);
        fund(&h, buyer);

        h.engine.add_ask(asker, unit(1), unit(10)).unwrap();
        h.engine.market_buy(buyer, unit(15)).unwrap();

        assert_eq!(
            h.book.balance_of(&buyer),
            Amount::new(SUPPLY).checked_add(unit(10)).unwrap()
        );
        assert_eq!(h.price.balance_of(&Address::from_u64(999)), unit(5));
        assert_eq!(h.engine.best_bid_price(), unit(1));
        let residual_id = h.engine.user_order_at(buyer, 1).unwrap();
        let residual = h.engine.order(residual_id);
        assert_eq!(residual.side, Side::Bid);
        assert_eq!(residual.remaining, unit(5));
        assert_eq!(residual.price, unit(1));
    }

    #[test]
    fn multi_level_market_sell() {
        let mut h = setup();
        let bidder = Address::from_u64(1);
        let seller = Address::from_u64(2);
        fund(&h, bidder);
        fund(&h, seller);

        h.engine.add_bid(bidder, unit(1), unit(10)).unwrap();
        h.engine.add_bid(bidder, unit(3), unit(10)).unwrap();
        h.engine.add_bid(bidder, unit(2), unit(10)).unwrap();

        assert_eq!(h.engine.open_bids_stack_at(0).unwrap(), unit(1));
        assert_eq!(h.engine.open_bids_stack_at(1).unwrap(), unit(2));
        assert_eq!(h.engine.open_bids_stack_at(2).unwrap(), unit(3));
        assert_eq!(h.engine.best_bid_price(), unit(3));

        let order_id = h.engine.market_sell(seller, unit(30)).unwrap();

        assert_eq!(h.engine.order(order_id).status, OrderStatus::Filled);
        assert_eq!(h.engine.market_price(), unit(1));
        assert_eq!(h.engine.best_bid_price(), Amount::ZERO);
        assert_eq!(h.engine.best_ask_price(), Amount::MAX);
        assert_eq!(
            h.book.balance_of(&bidder),
            Amount::new(SUPPLY).checked_add(unit(30)).unwrap()
        );
        assert_eq!(
            h.price.balance_of(&seller),
            Amount::new(SUPPLY).checked_add(unit(60)).unwrap()
        );
    }

    #[test]
    fn market_sell_overshoot_residual_rests() {
        let mut h = setup();
        let bidder = Address::from_u64(1);
        let seller = Address::from_u64(2);
        fund(&h, bidder);
        fund(&h, seller);

        h.engine.add_bid(bidder, unit(1), unit(10)).unwrap();
        h.engine.market_sell(seller, unit(15)).unwrap();

        assert_eq!(
            h.price.balance_of(&seller),
            Amount::new(SUPPLY).checked_add(unit(10)).unwrap()
        );
        assert_eq!(h.book.balance_of(&Address::from_u64(999)), unit(5));
        assert_eq!(h.engine.best_ask_price(), unit(1));
        let residual_id = h.engine.user_order_at(seller, 1).unwrap();
        let residual = h.engine.order(residual_id);
        assert_eq!(residual.side, Side::Ask);
        assert_eq!(residual.remaining, unit(5));
        assert_eq!(residual.price, unit(1));
    }

    #[test]
    fn market_sell_with_empty_book_is_rejected() {
        let mut h = setup();
        let seller = Address::from_u64(2);
        fund(&h, seller);
        assert_eq!(h.engine.market_sell(seller, unit(1)).unwrap_err(), MatchingError::NoOpenBids);
    }

    #[test]
    fn cancel_preserves_invariants() {
        let mut h = setup();
        let a = Address::from_u64(1);
        fund(&h, a);

        h.engine.add_bid(a, unit(1), unit(10)).unwrap();
        let middle = h.engine.add_bid(a, unit(2), unit(10)).unwrap();
        h.engine.add_bid(a, unit(3), unit(10)).unwrap();

        h.engine.cancel_order(a, middle).unwrap();

        assert_eq!(h.engine.open_bids_stack_at(0).unwrap(), unit(1));
        assert_eq!(h.engine.open_bids_stack_at(1).unwrap(), unit(3));
        assert!(h.engine.open_bids_stack_at(2).is_err());
        assert_eq!(h.engine.order(middle).status, OrderStatus::Cancelled);
        assert!(h.engine.order(middle).closed_at > 0);
    }

    #[test]
    fn add_bid_rejects_zero_price_and_amount() {
        let mut h = setup();
        let a = Address::from_u64(1);
        fund(&h, a);
        assert_eq!(h.engine.add_bid(a, Amount::ZERO, unit(1)).unwrap_err(), MatchingError::InvalidPrice);
        assert_eq!(h.engine.add_bid(a, unit(1), Amount::ZERO).unwrap_err(), MatchingError::InvalidAmount);
    }

    #[test]
    fn add_bid_rejects_price_above_best_ask() {
        let mut h = setup();
        let asker = Address::from_u64(1);
        let bidder = Address::from_u64(2);
        fund(&h, asker);
        fund(&h, bidder);
        h.engine.add_ask(asker, unit(1), unit(10)).unwrap();
        let err = h.engine.add_bid(bidder, unit(2), unit(1)).unwrap_err();
        assert_eq!(err, MatchingError::PriceAboveBestAsk);
    }

    #[test]
    fn market_buy_with_empty_book_is_rejected() {
        let mut h = setup();
        let buyer = Address::from_u64(2);
        fund(&h, buyer);
        assert_eq!(h.engine.market_buy(buyer, unit(1)).unwrap_err(), MatchingError::NoOpenAsks);
    }

    #[test]
    fn cancel_by_non_maker_is_rejected() {
        let mut h = setup();
        let a = Address::from_u64(1);
        let b = Address::from_u64(2);
        fund(&h, a);
        let id = h.engine.add_bid(a, unit(1), unit(10)).unwrap();
        assert_eq!(h.engine.cancel_order(b, id).unwrap_err(), MatchingError::NotOrderMaker);
    }

    #[test]
    fn cancel_of_unknown_order_is_rejected() {
        let mut h = setup();
        let a = Address::from_u64(1);
        assert_eq!(h.engine.cancel_order(a, OrderId(42)).unwrap_err(), MatchingError::OrderNotFound);
    }
}
