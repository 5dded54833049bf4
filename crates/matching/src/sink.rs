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

//! Trade notification capability
//!
//! The engine fans each generated trade out to exactly one registered
//! [`TradeSink`], synchronously, in emission order within a submit. A
//! sink that forwards to slow infrastructure should enqueue and return;
//! [`ChannelSink`] is the bounded-queue implementation of that shape,
//! drained by whatever publisher the egress collaborator runs.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use tracing::warn;

use crate::trade::Trade;

/// Receiver of trade notifications
///
/// Called on the submission path while no book lock is held. Must not
/// block the engine for longer than it takes to hand the trade off.
pub trait TradeSink: Send + Sync {
    fn on_trade(&self, trade: &Trade);
}

impl<F> TradeSink for F
where
    F: Fn(&Trade) + Send + Sync,
{
    fn on_trade(&self, trade: &Trade) {
        self(trade)
    }
}

/// Bounded hand-off sink
///
/// Enqueues trades onto a bounded channel and returns immediately. When
/// the queue is full the trade is dropped and counted; delivery
/// failures on the egress side are invisible to the engine by contract.
pub struct ChannelSink {
    sender: Sender<Trade>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiver its publisher drains.
    pub fn new(capacity: usize) -> (Self, TradeReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            TradeReceiver { receiver },
        )
    }

    /// Number of trades dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TradeSink for ChannelSink {
    fn on_trade(&self, trade: &Trade) {
        match self.sender.try_send(trade.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(trade)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(trade_id = trade.trade_id, "trade queue full, dropping");
            }
            Err(TrySendError::Disconnected(trade)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(trade_id = trade.trade_id, "trade publisher gone, dropping");
            }
        }
    }
}

/// Consumer end of a [`ChannelSink`] (used by the publisher)
pub struct TradeReceiver {
    receiver: Receiver<Trade>,
}

impl TradeReceiver {
    /// Receive the next trade, blocking until one arrives.
    ///
    /// Returns None once every sender is gone and the queue is empty.
    pub fn recv(&self) -> Option<Trade> {
        self.receiver.recv().ok()
    }

    /// Receive without blocking.
    pub fn try_recv(&self) -> Option<Trade> {
        match self.receiver.try_recv() {
            Ok(trade) => Some(trade),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drain up to `max_count` trades without blocking.
    pub fn drain(&self, max_count: usize) -> Vec<Trade> {
        let mut trades = Vec::with_capacity(max_count);
        while trades.len() < max_count {
            match self.try_recv() {
                Some(trade) => trades.push(trade),
                None => break,
            }
        }
        trades
    }
}
