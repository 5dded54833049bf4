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

//! Quasar Matching Engine
//!
//! A deterministic, multi-instrument matching engine for limit order
//! books. Per-instrument books enforce strict price-time priority,
//! trades execute at the maker's price, and cancellation is an O(1)
//! status flip reclaimed lazily at the head of the priority queues.
//!
//! Architecture:
//! - Per-book mutex: matching on one instrument never blocks another
//! - Concurrent instrument and order-routing maps, never held during
//!   matching
//! - Synchronous trade sink invoked outside book critical sections
//! - Bounded command queue between broker ingress and the engine

pub mod broker;
pub mod config;
pub mod engine;
pub mod ingress;
pub mod logging;
pub mod order;
pub mod orderbook;
pub mod otel;
pub mod sink;
pub mod trade;

pub use broker::{CancelRequest, SubmitRequest, TradeMessage};
pub use config::ServiceConfig;
pub use engine::{EngineError, EngineStats, MatchingEngine};
pub use ingress::{CommandQueue, CommandReceiver, CommandSender, EngineCommand, QueueError};
pub use order::{ClientId, Order, OrderId, OrderStatus, Price, Quantity, Side};
pub use orderbook::{BookLevel, MatchResult, OrderBook};
pub use sink::{ChannelSink, TradeReceiver, TradeSink};
pub use trade::{Trade, TradeId};
