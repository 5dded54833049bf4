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

mod stats;

pub use stats::EngineStats;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::order::{ClientId, Order, OrderId, OrderStatus, Price, Quantity, Side};
use crate::orderbook::{BookLevel, OrderBook};
use crate::sink::TradeSink;
use crate::trade::Trade;

/// Error types for engine operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("engine is draining, submissions are not accepted")]
    Draining,
}

/// Multi-instrument matching engine
///
/// Routes submissions and cancellations to per-instrument order books,
/// allocates order ids, maintains aggregate counters and fans out trade
/// notifications to the registered sink.
///
/// Concurrency model: the instrument map and routing index are
/// sharded concurrent maps whose locks are held only for lookup or
/// insertion; each book carries its own mutex, held for the duration of
/// one `process` or `cancel` on that book; counters sit under a narrow
/// stats lock. Lock order is instrument map, then book, then stats,
/// then sink, and no path acquires two of them in reverse. Sinks are
/// invoked after the book lock is released, so a slow subscriber never
/// extends a book's critical section.
pub struct MatchingEngine {
    /// Instrument -> book. Books are created lazily and never destroyed.
    books: DashMap<String, Arc<Mutex<OrderBook>>>,
    /// Order id -> instrument, for O(1) cancellation routing
    order_instruments: DashMap<OrderId, String>,
    /// Next order id to allocate; ids start at 1 and are never reused
    next_order_id: AtomicU64,
    stats: Mutex<EngineStats>,
    sink: RwLock<Option<Arc<dyn TradeSink>>>,
    draining: AtomicBool,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
            order_instruments: DashMap::new(),
            next_order_id: AtomicU64::new(1),
            stats: Mutex::new(EngineStats::default()),
            sink: RwLock::new(None),
            draining: AtomicBool::new(false),
        }
    }

    /// Register the trade sink, replacing any previous one.
    ///
    /// The sink is called synchronously on the submission path, once per
    /// trade, in emission order within a single submit. It must return
    /// quickly; enqueue-and-return sinks are the expected shape for
    /// anything that does I/O.
    pub fn set_trade_sink(&self, sink: Arc<dyn TradeSink>) {
        *self.sink.write() = Some(sink);
    }

    /// Submit a limit order.
    ///
    /// Allocates the order id, validates, routes to the instrument's
    /// book (creating it on first use), matches and rests the residual.
    /// Returns the allocated order id, or an error for a validation
    /// rejection; rejected submissions leave no trace beyond the
    /// rejected counter.
    pub fn submit(
        &self,
        client_id: ClientId,
        instrument: &str,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Result<OrderId, EngineError> {
        if self.draining.load(Ordering::Acquire) {
            return Err(EngineError::Draining);
        }

        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);

        if let Err(reason) = validate(instrument, price, quantity) {
            self.stats.lock().rejected_orders += 1;
            debug!(order_id, instrument, %reason, "order rejected");
            return Err(EngineError::InvalidOrder(reason));
        }

        self.order_instruments.insert(order_id, instrument.to_string());
        {
            let mut stats = self.stats.lock();
            stats.total_orders += 1;
            stats.active_orders += 1;
        }

        let book = self.book(instrument);
        let order = Order::new(
            order_id,
            client_id,
            instrument.to_string(),
            side,
            price,
            quantity,
        );
        let result = book.lock().process(order);

        debug!(
            order_id,
            instrument,
            trades = result.trades.len(),
            remaining = result.taker_remaining,
            "order processed"
        );

        if !result.trades.is_empty() {
            // Fan out after the book lock is released
            let sink = self.sink.read().clone();
            if let Some(sink) = sink {
                for trade in &result.trades {
                    notify(&sink, trade);
                }
            }

            let mut stats = self.stats.lock();
            stats.total_trades += result.trades.len() as u64;
            stats.active_orders -= result.filled_makers.len() as u64;
            if result.taker_status == OrderStatus::Filled {
                stats.active_orders -= 1;
            }
        }

        Ok(order_id)
    }

    /// Cancel an order by id.
    ///
    /// Returns false for ids that were never issued, route to a missing
    /// book, or refer to an order that already reached a terminal
    /// status; cancelling twice returns true then false.
    pub fn cancel(&self, order_id: OrderId) -> bool {
        let instrument = match self.order_instruments.get(&order_id) {
            Some(entry) => entry.value().clone(),
            None => return false,
        };

        let book = match self.books.get(&instrument) {
            Some(entry) => entry.value().clone(),
            None => return false,
        };

        let cancelled = book.lock().cancel(order_id);
        if cancelled {
            let mut stats = self.stats.lock();
            stats.cancelled_orders += 1;
            stats.active_orders -= 1;
            debug!(order_id, instrument, "order cancelled");
        }

        cancelled
    }

    /// Best bid for an instrument; None when unknown or empty.
    pub fn best_bid(&self, instrument: &str) -> Option<Price> {
        self.with_book(instrument, |book| book.best_bid()).flatten()
    }

    /// Best ask for an instrument; None when unknown or empty.
    pub fn best_ask(&self, instrument: &str) -> Option<Price> {
        self.with_book(instrument, |book| book.best_ask()).flatten()
    }

    /// Spread for an instrument; None unless both sides quote.
    pub fn spread(&self, instrument: &str) -> Option<Price> {
        self.with_book(instrument, |book| book.spread()).flatten()
    }

    /// Top `max_levels` aggregated bid levels, best first.
    pub fn bid_levels(&self, instrument: &str, max_levels: usize) -> Vec<BookLevel> {
        self.with_book(instrument, |book| book.bid_levels(max_levels))
            .unwrap_or_default()
    }

    /// Top `max_levels` aggregated ask levels, best first.
    pub fn ask_levels(&self, instrument: &str, max_levels: usize) -> Vec<BookLevel> {
        self.with_book(instrument, |book| book.ask_levels(max_levels))
            .unwrap_or_default()
    }

    /// The most recent trades on an instrument, oldest first.
    pub fn recent_trades(&self, instrument: &str, count: usize) -> Vec<Trade> {
        self.with_book(instrument, |book| book.recent_trades(count))
            .unwrap_or_default()
    }

    /// Live resting orders on an instrument, in arrival order.
    pub fn open_orders(&self, instrument: &str) -> Vec<Order> {
        self.with_book(instrument, |book| book.open_orders())
            .unwrap_or_default()
    }

    /// Snapshot of the aggregate counters.
    pub fn stats(&self) -> EngineStats {
        *self.stats.lock()
    }

    /// Every instrument a book has been created for.
    pub fn known_instruments(&self) -> Vec<String> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Physically drop terminal entries from every book.
    pub fn compact(&self) {
        for entry in self.books.iter() {
            entry.value().lock().compact();
        }
    }

    /// Stop accepting submissions; in-flight operations run to
    /// completion. Cancellations and queries remain available.
    pub fn drain(&self) {
        self.draining.store(true, Ordering::Release);
        info!("engine draining, rejecting new submissions");
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Look up or lazily create the book for an instrument.
    ///
    /// The map shard lock is released before the returned book is
    /// locked, so matching never runs under the instrument map.
    fn book(&self, instrument: &str) -> Arc<Mutex<OrderBook>> {
        self.books
            .entry(instrument.to_string())
            .or_insert_with(|| {
                info!(instrument, "creating order book");
                Arc::new(Mutex::new(OrderBook::new(instrument.to_string())))
            })
            .clone()
    }

    fn with_book<T>(&self, instrument: &str, f: impl FnOnce(&OrderBook) -> T) -> Option<T> {
        let book = self.books.get(instrument).map(|e| e.value().clone())?;
        let book = book.lock();
        Some(f(&book))
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(instrument: &str, price: Price, quantity: Quantity) -> Result<(), String> {
    if instrument.is_empty() {
        return Err("empty instrument".to_string());
    }
    if price == 0 {
        return Err("price must be positive".to_string());
    }
    if quantity == 0 {
        return Err("quantity must be positive".to_string());
    }
    Ok(())
}

/// Invoke the sink for one trade, confining panics to the sink.
fn notify(sink: &Arc<dyn TradeSink>, trade: &Trade) {
    let outcome = catch_unwind(AssertUnwindSafe(|| sink.on_trade(trade)));
    if outcome.is_err() {
        warn!(
            trade_id = trade.trade_id,
            instrument = %trade.instrument,
            "trade sink panicked, continuing"
        );
    }
}
