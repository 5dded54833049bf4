// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::order::{ClientId, OrderId, Price, Quantity, now_micros};

/// Book-local trade identifier, monotonically increasing within one
/// book. `(instrument, trade_id)` is the globally unique key.
pub type TradeId = u64;

/// Immutable record of a match between a taker and a maker
///
/// Trades are constructed only by the order book during matching. The
/// price is always the maker's limit price; the taker's limit only
/// gates crossability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub instrument: String,
    /// Execution price in ticks (the maker's limit)
    pub price: Price,
    pub quantity: Quantity,
    pub taker_order_id: OrderId,
    pub maker_order_id: OrderId,
    pub taker_client_id: ClientId,
    pub maker_client_id: ClientId,
    /// Microseconds since epoch at emission
    pub timestamp: u64,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        trade_id: TradeId,
        instrument: String,
        price: Price,
        quantity: Quantity,
        taker_order_id: OrderId,
        maker_order_id: OrderId,
        taker_client_id: ClientId,
        maker_client_id: ClientId,
    ) -> Self {
        Self {
            trade_id,
            instrument,
            price,
            quantity,
            taker_order_id,
            maker_order_id,
            taker_client_id,
            maker_client_id,
            timestamp: now_micros(),
        }
    }

    /// Monetary value of the trade (price x quantity) in ticks.
    pub fn value(&self) -> u64 {
        self.price * self.quantity
    }

    pub fn involves_order(&self, order_id: OrderId) -> bool {
        self.taker_order_id == order_id || self.maker_order_id == order_id
    }

    pub fn involves_client(&self, client_id: ClientId) -> bool {
        self.taker_client_id == client_id || self.maker_client_id == client_id
    }
}

impl Ord for Trade {
    /// Stable ordering by emission time, then by trade id.
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.trade_id.cmp(&other.trade_id))
    }
}

impl PartialOrd for Trade {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade{{id={}, instrument={}, price={}, qty={}, value={}, taker={}, maker={}, ts={}}}",
            self.trade_id,
            self.instrument,
            self.price,
            self.quantity,
            self.value(),
            self.taker_order_id,
            self.maker_order_id,
            self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(trade_id: TradeId, timestamp: u64) -> Trade {
        Trade {
            trade_id,
            instrument: "BTC-USD".to_string(),
            price: 50000,
            quantity: 3,
            taker_order_id: 2,
            maker_order_id: 1,
            taker_client_id: 101,
            maker_client_id: 100,
            timestamp,
        }
    }

    #[test]
    fn test_value() {
        assert_eq!(trade(1, 0).value(), 150_000);
    }

    #[test]
    fn test_involvement() {
        let t = trade(1, 0);
        assert!(t.involves_order(1));
        assert!(t.involves_order(2));
        assert!(!t.involves_order(3));
        assert!(t.involves_client(100));
        assert!(!t.involves_client(102));
    }

    #[test]
    fn test_ordering_by_timestamp_then_id() {
        let mut trades = vec![trade(3, 200), trade(2, 100), trade(1, 100)];
        trades.sort();
        let ids: Vec<TradeId> = trades.iter().map(|t| t.trade_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_display_includes_value() {
        let rendered = trade(1, 42).to_string();
        assert!(rendered.contains("value=150000"));
        assert!(rendered.contains("instrument=BTC-USD"));
    }
}
