//! The engine's audit trail.
//!
//! The teacher keeps a global, sequenced `MatchingEvent` log behind an
//! async `SharedEventLog` (`event.rs` + `log.rs`) for a multi-instrument,
//! multi-writer deployment. This engine is single-writer and
//! single-instrument (spec §5): every operation already runs to completion
//! before the next one starts, so the log here is a plain, synchronous
//! `Vec` the engine appends to inline — no `Arc`/`RwLock`, no `tokio`.

use crate::domain::OrderId;
use common::{Address, Amount};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchingEvent {
    OrderAccepted {
        order_id: OrderId,
        maker: Address,
    },
    Trade {
        taker_id: OrderId,
        maker_id: OrderId,
        price: Amount,
        book_filled: Amount,
    },
    OrderCancelled {
        order_id: OrderId,
    },
}

#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<MatchingEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: MatchingEvent) {
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchingEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_iterate_preserve_order() {
        let mut log = EventLog::new();
        log.push(MatchingEvent::OrderAccepted {
            order_id: OrderId(1),
            maker: Address::from_u64(1),
        });
        log.push(MatchingEvent::OrderCancelled { order_id: OrderId(1) });
        assert_eq!(log.len(), 2);
        let ids: Vec<_> = log
            .iter()
            .map(|e| match e {
                MatchingEvent::OrderAccepted { order_id, .. } => *order_id,
                MatchingEvent::OrderCancelled { order_id } => *order_id,
                MatchingEvent::Trade { taker_id, .. } => *taker_id,
            })
            .collect();
        assert_eq!(ids, vec![OrderId(1), OrderId(1)]);
    }
}
