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

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Engine-assigned order identifier, monotonically increasing from 1.
pub type OrderId = u64;
/// Caller-supplied opaque client identifier, carried through to trades.
pub type ClientId = u64;
/// Limit price in integer ticks.
pub type Price = u64;
/// Order quantity in whole units.
pub type Quantity = u64;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side this order matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order lifecycle status
///
/// Transitions: New -> {PartiallyFilled, Filled, Cancelled, Rejected};
/// PartiallyFilled -> {PartiallyFilled, Filled, Cancelled}. Filled,
/// Cancelled and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

/// Current time in microseconds since the Unix epoch.
pub(crate) fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// A resting or incoming limit order
///
/// Orders are created by the engine at submission and owned by the book
/// they rest in. All quantity accounting goes through [`Order::fill`],
/// which maintains the status machine and keeps `filled_quantity`
/// monotonically nondecreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Engine-assigned identifier, unique for the engine lifetime
    pub order_id: OrderId,
    /// Opaque caller identifier
    pub client_id: ClientId,
    /// Instrument this order trades (e.g. "BTC-USD", case-sensitive)
    pub instrument: String,
    pub side: Side,
    /// Limit price in ticks
    pub price: Price,
    /// Original quantity
    pub quantity: Quantity,
    /// Cumulative filled quantity, never exceeds `quantity`
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    /// Microseconds since epoch at creation
    pub created_ts: u64,
    /// Microseconds since epoch at the last state transition
    pub updated_ts: u64,
}

impl Order {
    pub fn new(
        order_id: OrderId,
        client_id: ClientId,
        instrument: String,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        let now = now_micros();
        Self {
            order_id,
            client_id,
            instrument,
            side,
            price,
            quantity,
            filled_quantity: 0,
            status: OrderStatus::New,
            created_ts: now,
            updated_ts: now,
        }
    }

    /// Quantity still open for matching.
    pub fn remaining(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    /// Apply a fill of up to `quantity` units.
    ///
    /// The fill is clamped to [`Order::remaining`]. Cancelled and
    /// rejected orders accept no further fills; the call is a no-op on
    /// them.
    pub fn fill(&mut self, quantity: Quantity) {
        if matches!(self.status, OrderStatus::Cancelled | OrderStatus::Rejected) {
            return;
        }

        let quantity = quantity.min(self.remaining());
        self.filled_quantity += quantity;

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.filled_quantity > 0 {
            self.status = OrderStatus::PartiallyFilled;
        }

        self.touch();
    }

    /// Cancel the order. Idempotent: a second call on a terminal order
    /// is a no-op.
    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = OrderStatus::Cancelled;
        self.touch();
    }

    /// Reject the order. Idempotent on terminal orders.
    pub fn reject(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = OrderStatus::Rejected;
        self.touch();
    }

    /// Whether this order's limit crosses `other`'s on the same
    /// instrument.
    pub fn crosses(&self, other: &Order) -> bool {
        if self.instrument != other.instrument || self.side == other.side {
            return false;
        }
        if self.status.is_terminal() || other.status.is_terminal() {
            return false;
        }
        match self.side {
            Side::Buy => self.price >= other.price,
            Side::Sell => self.price <= other.price,
        }
    }

    /// Notional value of the full order (price x quantity) in ticks.
    pub fn notional(&self) -> u64 {
        self.price * self.quantity
    }

    /// Notional value of the filled portion in ticks.
    pub fn filled_notional(&self) -> u64 {
        self.price * self.filled_quantity
    }

    /// Notional value of the open portion in ticks.
    pub fn remaining_notional(&self) -> u64 {
        self.price * self.remaining()
    }

    /// Filled fraction of the order in percent.
    pub fn fill_percentage(&self) -> f64 {
        if self.quantity == 0 {
            return 0.0;
        }
        (self.filled_quantity as f64 / self.quantity as f64) * 100.0
    }

    fn touch(&mut self) {
        self.updated_ts = self.updated_ts.max(now_micros());
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order{{id={}, client={}, instrument={}, side={}, price={}, qty={}, filled={}, status={}}}",
            self.order_id,
            self.client_id,
            self.instrument,
            self.side,
            self.price,
            self.quantity,
            self.filled_quantity,
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(side: Side, price: Price, quantity: Quantity) -> Order {
        Order::new(1, 100, "BTC-USD".to_string(), side, price, quantity)
    }

    #[test]
    fn test_new_order_is_open() {
        let o = order(Side::Buy, 50000, 10);
        assert_eq!(o.status, OrderStatus::New);
        assert_eq!(o.remaining(), 10);
        assert!(!o.is_filled());
    }

    #[test]
    fn test_partial_then_full_fill() {
        let mut o = order(Side::Buy, 50000, 10);

        o.fill(4);
        assert_eq!(o.status, OrderStatus::PartiallyFilled);
        assert_eq!(o.remaining(), 6);

        o.fill(6);
        assert_eq!(o.status, OrderStatus::Filled);
        assert_eq!(o.remaining(), 0);
    }

    #[test]
    fn test_fill_is_clamped_to_remaining() {
        let mut o = order(Side::Sell, 50000, 5);
        o.fill(100);
        assert_eq!(o.filled_quantity, 5);
        assert_eq!(o.status, OrderStatus::Filled);
    }

    #[test]
    fn test_no_fill_after_cancel() {
        let mut o = order(Side::Buy, 50000, 10);
        o.cancel();
        assert_eq!(o.status, OrderStatus::Cancelled);

        o.fill(5);
        assert_eq!(o.filled_quantity, 0);
        assert_eq!(o.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut o = order(Side::Buy, 50000, 10);
        o.fill(10);
        let ts = o.updated_ts;

        o.cancel();
        assert_eq!(o.status, OrderStatus::Filled);
        assert_eq!(o.updated_ts, ts);
    }

    #[test]
    fn test_reject_is_terminal() {
        let mut o = order(Side::Sell, 50000, 10);
        o.reject();
        assert_eq!(o.status, OrderStatus::Rejected);

        o.cancel();
        assert_eq!(o.status, OrderStatus::Rejected);
    }

    #[test]
    fn test_crosses() {
        let buy = order(Side::Buy, 50000, 10);
        let mut sell = Order::new(2, 101, "BTC-USD".to_string(), Side::Sell, 49999, 5);
        assert!(buy.crosses(&sell));
        assert!(sell.crosses(&buy));

        sell.price = 50001;
        assert!(!buy.crosses(&sell));

        let other = Order::new(3, 102, "ETH-USD".to_string(), Side::Sell, 1, 1);
        assert!(!buy.crosses(&other));
    }

    #[test]
    fn test_notional() {
        let mut o = order(Side::Buy, 50000, 10);
        o.fill(4);
        assert_eq!(o.notional(), 500_000);
        assert_eq!(o.filled_notional(), 200_000);
        assert_eq!(o.remaining_notional(), 300_000);
        assert!((o.fill_percentage() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }
}
