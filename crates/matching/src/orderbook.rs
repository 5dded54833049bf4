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
use std::collections::{BinaryHeap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderId, OrderStatus, Price, Quantity, Side};
use crate::trade::{Trade, TradeId};

/// Resident trade history kept per book for market-data queries.
const TRADE_HISTORY_LIMIT: usize = 1000;

/// Priority key for the bid queue: higher price first, then lower
/// order id (earlier arrival) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BidKey {
    price: Price,
    order_id: OrderId,
}

impl Ord for BidKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .cmp(&other.price)
            .then_with(|| other.order_id.cmp(&self.order_id))
    }
}

impl PartialOrd for BidKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority key for the ask queue: lower price first, then lower
/// order id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AskKey {
    price: Price,
    order_id: OrderId,
}

impl Ord for AskKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .price
            .cmp(&self.price)
            .then_with(|| other.order_id.cmp(&self.order_id))
    }
}

impl PartialOrd for AskKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

trait QueueKey: Ord + Copy {
    fn order_id(&self) -> OrderId;
}

impl QueueKey for BidKey {
    fn order_id(&self) -> OrderId {
        self.order_id
    }
}

impl QueueKey for AskKey {
    fn order_id(&self) -> OrderId {
        self.order_id
    }
}

/// One aggregated price level of book depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    /// Total remaining quantity resting at this price
    pub quantity: Quantity,
    /// Number of live orders at this price
    pub order_count: u32,
}

/// Outcome of processing one incoming order against the book
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Trades generated, in emission order
    pub trades: Vec<Trade>,
    /// Maker orders that reached FILLED during this match
    pub filled_makers: Vec<OrderId>,
    /// Final status of the incoming order
    pub taker_status: OrderStatus,
    /// Open quantity of the incoming order after matching
    pub taker_remaining: Quantity,
}

/// Price-time-priority limit order book for a single instrument
///
/// The book owns every resident order. Two priority queues of small
/// copyable keys index into the order store; cancellation flips a status
/// flag in O(1) and the stale entry is reclaimed when it surfaces at the
/// head of its queue during matching (lazy reclamation). Queries walk a
/// cloned key queue read-only, so stale entries never distort results
/// and the live structure is not mutated.
///
/// For a given serial sequence of submissions and cancellations the
/// emitted trade stream is fully determined by price-time priority and
/// arrival order.
#[derive(Debug, Clone)]
pub struct OrderBook {
    instrument: String,
    /// Order store; owns all resident orders
    orders: HashMap<OrderId, Order>,
    bids: BinaryHeap<BidKey>,
    asks: BinaryHeap<AskKey>,
    /// Next book-local trade id
    next_trade_id: TradeId,
    /// Bounded history of recent trades, oldest first
    trades: VecDeque<Trade>,
}

impl OrderBook {
    pub fn new(instrument: String) -> Self {
        Self {
            instrument,
            orders: HashMap::new(),
            bids: BinaryHeap::new(),
            asks: BinaryHeap::new(),
            next_trade_id: 1,
            trades: VecDeque::new(),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Add a resting order to the book without matching it.
    pub fn add(&mut self, order: Order) {
        match order.side {
            Side::Buy => self.bids.push(BidKey {
                price: order.price,
                order_id: order.order_id,
            }),
            Side::Sell => self.asks.push(AskKey {
                price: order.price,
                order_id: order.order_id,
            }),
        }
        self.orders.insert(order.order_id, order);
    }

    /// Match an incoming order against the opposite side, then rest any
    /// residual quantity.
    ///
    /// Trades execute at the maker's price; the incoming limit only
    /// gates crossability. Fully filled and cancelled makers are
    /// reclaimed as they surface at the head of their queue.
    pub fn process(&mut self, mut order: Order) -> MatchResult {
        let mut trades = Vec::new();
        let mut filled_makers = Vec::new();

        match order.side {
            Side::Buy => self.match_against_asks(&mut order, &mut trades, &mut filled_makers),
            Side::Sell => self.match_against_bids(&mut order, &mut trades, &mut filled_makers),
        }

        let taker_status = order.status;
        let taker_remaining = order.remaining();

        if !order.is_filled() && order.status != OrderStatus::Cancelled {
            self.add(order);
        }

        self.reclaim_heads();

        MatchResult {
            trades,
            filled_makers,
            taker_status,
            taker_remaining,
        }
    }

    fn match_against_asks(
        &mut self,
        taker: &mut Order,
        trades: &mut Vec<Trade>,
        filled_makers: &mut Vec<OrderId>,
    ) {
        while taker.remaining() > 0 {
            let head = match self.asks.peek() {
                Some(key) => *key,
                None => break,
            };

            let maker = self
                .orders
                .get(&head.order_id)
                .expect("ask queue out of sync with order store");

            // Reclaim cancelled or already-filled heads
            if maker.status.is_terminal() {
                self.asks.pop();
                self.orders.remove(&head.order_id);
                continue;
            }

            // Prices cross when buy limit >= ask price
            if taker.price < maker.price {
                break;
            }

            let quantity = taker.remaining().min(maker.remaining());
            let trade = Trade::new(
                self.next_trade_id,
                self.instrument.clone(),
                maker.price,
                quantity,
                taker.order_id,
                maker.order_id,
                taker.client_id,
                maker.client_id,
            );
            self.next_trade_id += 1;

            taker.fill(quantity);
            let maker = self
                .orders
                .get_mut(&head.order_id)
                .expect("ask queue out of sync with order store");
            maker.fill(quantity);

            if maker.is_filled() {
                filled_makers.push(head.order_id);
                self.asks.pop();
                self.orders.remove(&head.order_id);
            }

            self.record_trade(trade.clone());
            trades.push(trade);
        }
    }

    fn match_against_bids(
        &mut self,
        taker: &mut Order,
        trades: &mut Vec<Trade>,
        filled_makers: &mut Vec<OrderId>,
    ) {
        while taker.remaining() > 0 {
            let head = match self.bids.peek() {
                Some(key) => *key,
                None => break,
            };

            let maker = self
                .orders
                .get(&head.order_id)
                .expect("bid queue out of sync with order store");

            if maker.status.is_terminal() {
                self.bids.pop();
                self.orders.remove(&head.order_id);
                continue;
            }

            // Prices cross when sell limit <= bid price
            if taker.price > maker.price {
                break;
            }

            let quantity = taker.remaining().min(maker.remaining());
            let trade = Trade::new(
                self.next_trade_id,
                self.instrument.clone(),
                maker.price,
                quantity,
                taker.order_id,
                maker.order_id,
                taker.client_id,
                maker.client_id,
            );
            self.next_trade_id += 1;

            taker.fill(quantity);
            let maker = self
                .orders
                .get_mut(&head.order_id)
                .expect("bid queue out of sync with order store");
            maker.fill(quantity);

            if maker.is_filled() {
                filled_makers.push(head.order_id);
                self.bids.pop();
                self.orders.remove(&head.order_id);
            }

            self.record_trade(trade.clone());
            trades.push(trade);
        }
    }

    /// Mark a resident order cancelled.
    ///
    /// Returns false if the order is unknown to this book or already
    /// terminal. The entry is not removed here; it is reclaimed lazily
    /// the next time it surfaces at the head of its queue.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        match self.orders.get_mut(&order_id) {
            Some(order) if !order.status.is_terminal() => {
                order.cancel();
                true
            }
            _ => false,
        }
    }

    /// Drop terminal entries sitting at the head of either queue.
    fn reclaim_heads(&mut self) {
        while let Some(head) = self.bids.peek().copied() {
            let live = self
                .orders
                .get(&head.order_id)
                .is_some_and(|o| !o.status.is_terminal());
            if live {
                break;
            }
            self.bids.pop();
            self.orders.remove(&head.order_id);
        }

        while let Some(head) = self.asks.peek().copied() {
            let live = self
                .orders
                .get(&head.order_id)
                .is_some_and(|o| !o.status.is_terminal());
            if live {
                break;
            }
            self.asks.pop();
            self.orders.remove(&head.order_id);
        }
    }

    /// Price of the best live bid, skipping stale entries.
    pub fn best_bid(&self) -> Option<Price> {
        self.first_live_price(&self.bids)
    }

    /// Price of the best live ask, skipping stale entries.
    pub fn best_ask(&self) -> Option<Price> {
        self.first_live_price(&self.asks)
    }

    /// Best ask minus best bid; None unless both sides quote.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Aggregate the top `max_levels` distinct bid prices, best first.
    pub fn bid_levels(&self, max_levels: usize) -> Vec<BookLevel> {
        self.aggregate_levels(&self.bids, max_levels)
    }

    /// Aggregate the top `max_levels` distinct ask prices, best first.
    pub fn ask_levels(&self, max_levels: usize) -> Vec<BookLevel> {
        self.aggregate_levels(&self.asks, max_levels)
    }

    /// Total live remaining quantity on the bid side.
    pub fn bid_volume(&self) -> Quantity {
        self.side_volume(&self.bids)
    }

    /// Total live remaining quantity on the ask side.
    pub fn ask_volume(&self) -> Quantity {
        self.side_volume(&self.asks)
    }

    /// Look up a resident order.
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// All live resident orders, in arrival order.
    pub fn open_orders(&self) -> Vec<Order> {
        let mut open: Vec<Order> = self
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect();
        open.sort_by_key(|o| o.order_id);
        open
    }

    /// The most recent `count` trades, oldest first.
    pub fn recent_trades(&self, count: usize) -> Vec<Trade> {
        let skip = self.trades.len().saturating_sub(count);
        self.trades.iter().skip(skip).cloned().collect()
    }

    /// Number of resident orders, live or awaiting reclamation.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Walk both queues and physically drop every terminal entry.
    ///
    /// Lazy reclamation bounds the heap footprint by submitted minus
    /// popped orders; this pass tightens it to live orders only.
    pub fn compact(&mut self) {
        self.orders.retain(|_, order| !order.status.is_terminal());

        let bids: BinaryHeap<BidKey> = self
            .bids
            .iter()
            .filter(|key| self.orders.contains_key(&key.order_id))
            .copied()
            .collect();
        self.bids = bids;

        let asks: BinaryHeap<AskKey> = self
            .asks
            .iter()
            .filter(|key| self.orders.contains_key(&key.order_id))
            .copied()
            .collect();
        self.asks = asks;
    }

    fn first_live_price<K: QueueKey>(&self, keys: &BinaryHeap<K>) -> Option<Price> {
        let mut keys = keys.clone();
        while let Some(key) = keys.pop() {
            if let Some(order) = self.orders.get(&key.order_id()) {
                if !order.status.is_terminal() {
                    return Some(order.price);
                }
            }
        }
        None
    }

    fn aggregate_levels<K: QueueKey>(
        &self,
        keys: &BinaryHeap<K>,
        max_levels: usize,
    ) -> Vec<BookLevel> {
        let mut keys = keys.clone();
        let mut levels: Vec<BookLevel> = Vec::new();

        while let Some(key) = keys.pop() {
            let order = match self.orders.get(&key.order_id()) {
                Some(order) if !order.status.is_terminal() => order,
                _ => continue,
            };

            // Equal prices pop contiguously, so levels stay grouped
            if let Some(level) = levels.last_mut() {
                if level.price == order.price {
                    level.quantity += order.remaining();
                    level.order_count += 1;
                    continue;
                }
            }

            if levels.len() == max_levels {
                break;
            }
            levels.push(BookLevel {
                price: order.price,
                quantity: order.remaining(),
                order_count: 1,
            });
        }

        levels
    }

    fn side_volume<K: QueueKey>(&self, keys: &BinaryHeap<K>) -> Quantity {
        let mut keys = keys.clone();
        let mut volume = 0;
        while let Some(key) = keys.pop() {
            if let Some(order) = self.orders.get(&key.order_id()) {
                if !order.status.is_terminal() {
                    volume += order.remaining();
                }
            }
        }
        volume
    }

    fn record_trade(&mut self, trade: Trade) {
        self.trades.push_back(trade);
        if self.trades.len() > TRADE_HISTORY_LIMIT {
            self.trades.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> OrderBook {
        OrderBook::new("BTC-USD".to_string())
    }

    fn order(order_id: OrderId, side: Side, price: Price, quantity: Quantity) -> Order {
        Order::new(
            order_id,
            100 + order_id,
            "BTC-USD".to_string(),
            side,
            price,
            quantity,
        )
    }

    #[test]
    fn test_add_single_buy_order() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 10));

        assert_eq!(book.best_bid(), Some(50000));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_add_buy_and_sell_no_match() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 10));
        book.add(order(2, Side::Sell, 50100, 5));

        assert_eq!(book.best_bid(), Some(50000));
        assert_eq!(book.best_ask(), Some(50100));
        assert_eq!(book.spread(), Some(100));
    }

    #[test]
    fn test_empty_book_order_rests_in_full() {
        let mut book = book();
        let result = book.process(order(1, Side::Buy, 50000, 10));

        assert!(result.trades.is_empty());
        assert_eq!(result.taker_status, OrderStatus::New);
        assert_eq!(result.taker_remaining, 10);
        assert_eq!(book.best_bid(), Some(50000));
    }

    #[test]
    fn test_simple_match_at_maker_price() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 10));

        let result = book.process(order(2, Side::Sell, 49999, 5));

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].price, 50000);
        assert_eq!(result.trades[0].quantity, 5);
        assert_eq!(result.trades[0].taker_order_id, 2);
        assert_eq!(result.trades[0].maker_order_id, 1);
        assert_eq!(result.taker_status, OrderStatus::Filled);

        // Maker stays at the head with reduced quantity
        assert_eq!(book.best_bid(), Some(50000));
        assert_eq!(book.bid_volume(), 5);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_exact_quantity_match_clears_both() {
        let mut book = book();
        book.add(order(1, Side::Sell, 50000, 5));

        let result = book.process(order(2, Side::Buy, 50000, 5));

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.taker_status, OrderStatus::Filled);
        assert_eq!(result.filled_makers, vec![1]);
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_partial_taker_rests_at_its_limit() {
        let mut book = book();
        book.add(order(1, Side::Sell, 50000, 4));

        let result = book.process(order(2, Side::Buy, 50003, 10));

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.taker_status, OrderStatus::PartiallyFilled);
        assert_eq!(result.taker_remaining, 6);
        assert_eq!(book.best_bid(), Some(50003));
    }

    #[test]
    fn test_price_priority_across_levels() {
        let mut book = book();
        book.add(order(1, Side::Sell, 50002, 1));
        book.add(order(2, Side::Sell, 50000, 1));
        book.add(order(3, Side::Sell, 50001, 1));

        let result = book.process(order(4, Side::Buy, 50002, 3));

        let prices: Vec<Price> = result.trades.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![50000, 50001, 50002]);
    }

    #[test]
    fn test_time_priority_within_level() {
        let mut book = book();
        book.add(order(1, Side::Sell, 50000, 1));
        book.add(order(2, Side::Sell, 50000, 1));
        book.add(order(3, Side::Sell, 50000, 1));

        let result = book.process(order(4, Side::Buy, 50000, 3));

        let makers: Vec<OrderId> = result.trades.iter().map(|t| t.maker_order_id).collect();
        assert_eq!(makers, vec![1, 2, 3]);
    }

    #[test]
    fn test_trade_ids_are_book_local_and_monotonic() {
        let mut book = book();
        book.add(order(1, Side::Sell, 50000, 1));
        book.add(order(2, Side::Sell, 50000, 1));

        let result = book.process(order(3, Side::Buy, 50000, 2));

        let ids: Vec<TradeId> = result.trades.iter().map(|t| t.trade_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_cancel_marks_without_removing() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 10));

        assert!(book.cancel(1));
        // Entry stays resident until it surfaces at the head during a match
        assert_eq!(book.order_count(), 1);
        // But queries skip it
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_cancel_is_idempotent_in_effect() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 10));

        assert!(book.cancel(1));
        assert!(!book.cancel(1));
        assert!(!book.cancel(42));
    }

    #[test]
    fn test_cancel_of_filled_order_returns_false() {
        let mut book = book();
        book.add(order(1, Side::Sell, 50000, 5));
        book.process(order(2, Side::Buy, 50000, 5));

        assert!(!book.cancel(1));
    }

    #[test]
    fn test_cancelled_head_is_reclaimed_during_match() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 10));
        book.cancel(1);

        // The sell would cross the cancelled bid; it must not trade
        let result = book.process(order(2, Side::Sell, 50000, 10));

        assert!(result.trades.is_empty());
        assert_eq!(book.best_ask(), Some(50000));
        assert_eq!(book.best_bid(), None);
        // The cancelled bid was physically dropped at the head
        assert!(book.order(1).is_none());
    }

    #[test]
    fn test_queries_do_not_mutate_the_book() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50001, 1));
        book.add(order(2, Side::Buy, 50000, 2));
        book.cancel(1);

        assert_eq!(book.best_bid(), Some(50000));
        assert_eq!(book.best_bid(), Some(50000));
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_level_aggregation() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 1));
        book.add(order(2, Side::Buy, 50000, 2));
        book.add(order(3, Side::Buy, 49999, 3));
        book.add(order(4, Side::Buy, 49998, 4));

        let levels = book.bid_levels(2);
        assert_eq!(levels.len(), 2);
        assert_eq!(
            levels[0],
            BookLevel {
                price: 50000,
                quantity: 3,
                order_count: 2
            }
        );
        assert_eq!(
            levels[1],
            BookLevel {
                price: 49999,
                quantity: 3,
                order_count: 1
            }
        );
    }

    #[test]
    fn test_ask_levels_best_first() {
        let mut book = book();
        book.add(order(1, Side::Sell, 50002, 1));
        book.add(order(2, Side::Sell, 50000, 1));

        let levels = book.ask_levels(10);
        let prices: Vec<Price> = levels.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![50000, 50002]);
    }

    #[test]
    fn test_compact_drops_terminal_entries() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 1));
        book.add(order(2, Side::Buy, 49999, 1));
        book.add(order(3, Side::Sell, 50100, 1));
        book.cancel(2);
        book.cancel(3);

        book.compact();

        assert_eq!(book.order_count(), 1);
        assert_eq!(book.best_bid(), Some(50000));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_recent_trades_history() {
        let mut book = book();
        book.add(order(1, Side::Sell, 50000, 2));
        book.add(order(2, Side::Sell, 50001, 2));
        book.process(order(3, Side::Buy, 50001, 4));

        let trades = book.recent_trades(10);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, 50000);
        assert_eq!(trades[1].price, 50001);

        let last = book.recent_trades(1);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].price, 50001);
    }

    #[test]
    fn test_open_orders_lists_live_only() {
        let mut book = book();
        book.add(order(1, Side::Buy, 50000, 1));
        book.add(order(2, Side::Buy, 49999, 1));
        book.cancel(2);

        let open = book.open_orders();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].order_id, 1);
    }
}
