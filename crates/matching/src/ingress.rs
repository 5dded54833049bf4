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

//! Command ingress for broker-fed deployments
//!
//! The broker collaborator decodes envelopes off its partitioned stream
//! and enqueues [`EngineCommand`]s here; the consumer applies them to
//! the engine in arrival order. Per-instrument ordering is the
//! transport's obligation (partition key = instrument); the queue only
//! preserves the order it was handed. The engine is not idempotent, so
//! at-least-once transports must deduplicate before enqueueing.

use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::engine::MatchingEngine;
use crate::order::{ClientId, OrderId, Price, Quantity, Side};

/// A decoded instruction for the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    Submit {
        client_id: ClientId,
        instrument: String,
        side: Side,
        price: Price,
        quantity: Quantity,
    },
    Cancel {
        order_id: OrderId,
    },
}

/// Errors when interacting with the command queue
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("command queue is full")]
    Full,
    #[error("command queue is empty")]
    Empty,
    #[error("command queue disconnected")]
    Disconnected,
}

/// Bounded MPSC queue between ingress threads and the engine consumer
///
/// Multiple producers (one per broker partition handler), single
/// consumer. Bounded capacity gives backpressure: a full queue tells
/// the ingress side to stop pulling from the broker rather than buffer
/// without limit.
pub struct CommandQueue {
    sender: Sender<EngineCommand>,
    receiver: Receiver<EngineCommand>,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Split into the cloneable producer end and the unique consumer end.
    pub fn split(self) -> (CommandSender, CommandReceiver) {
        (
            CommandSender {
                sender: self.sender,
            },
            CommandReceiver {
                receiver: self.receiver,
            },
        )
    }
}

/// Producer end of the command queue
#[derive(Clone)]
pub struct CommandSender {
    sender: Sender<EngineCommand>,
}

impl CommandSender {
    /// Enqueue a command without blocking.
    pub fn try_enqueue(&self, command: EngineCommand) -> Result<(), QueueError> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Disconnected(_) => QueueError::Disconnected,
        })
    }

    pub fn is_full(&self) -> bool {
        self.sender.is_full()
    }
}

/// Consumer end of the command queue; exactly one consumer loop owns it
pub struct CommandReceiver {
    receiver: Receiver<EngineCommand>,
}

impl CommandReceiver {
    /// Receive the next command, blocking until one arrives.
    pub fn recv(&self) -> Result<EngineCommand, QueueError> {
        self.receiver.recv().map_err(|_| QueueError::Disconnected)
    }

    /// Receive without blocking.
    pub fn try_recv(&self) -> Result<EngineCommand, QueueError> {
        self.receiver.try_recv().map_err(|e| match e {
            TryRecvError::Empty => QueueError::Empty,
            TryRecvError::Disconnected => QueueError::Disconnected,
        })
    }
}

/// Apply one command to the engine.
pub fn apply_command(engine: &MatchingEngine, command: EngineCommand) {
    match command {
        EngineCommand::Submit {
            client_id,
            instrument,
            side,
            price,
            quantity,
        } => match engine.submit(client_id, &instrument, side, price, quantity) {
            Ok(order_id) => debug!(order_id, %instrument, "submitted"),
            Err(e) => warn!(%instrument, error = %e, "submit rejected"),
        },
        EngineCommand::Cancel { order_id } => {
            if !engine.cancel(order_id) {
                debug!(order_id, "cancel had no effect");
            }
        }
    }
}

/// Drain the command queue into the engine until every sender is gone.
///
/// Runs on a dedicated thread; returns once the queue disconnects.
pub fn run_consumer(receiver: CommandReceiver, engine: Arc<MatchingEngine>) {
    info!("command consumer started");
    loop {
        match receiver.recv() {
            Ok(command) => apply_command(&engine, command),
            Err(QueueError::Disconnected) => break,
            Err(e) => {
                error!(error = %e, "unexpected queue error");
                break;
            }
        }
    }
    info!("command consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(instrument: &str, side: Side, price: Price, quantity: Quantity) -> EngineCommand {
        EngineCommand::Submit {
            client_id: 100,
            instrument: instrument.to_string(),
            side,
            price,
            quantity,
        }
    }

    #[test]
    fn test_enqueue_and_recv() {
        let (sender, receiver) = CommandQueue::new(10).split();

        sender.try_enqueue(submit("BTC-USD", Side::Buy, 50000, 1)).unwrap();
        let received = receiver.recv().unwrap();
        assert!(matches!(received, EngineCommand::Submit { .. }));
    }

    #[test]
    fn test_queue_full_backpressure() {
        let (sender, _receiver) = CommandQueue::new(2).split();

        sender.try_enqueue(submit("BTC-USD", Side::Buy, 50000, 1)).unwrap();
        sender.try_enqueue(submit("BTC-USD", Side::Buy, 50000, 1)).unwrap();

        let result = sender.try_enqueue(submit("BTC-USD", Side::Buy, 50000, 1));
        assert_eq!(result, Err(QueueError::Full));
        assert!(sender.is_full());
    }

    #[test]
    fn test_consumer_applies_commands_in_order() {
        let engine = Arc::new(MatchingEngine::new());
        let (sender, receiver) = CommandQueue::new(64).split();

        sender.try_enqueue(submit("BTC-USD", Side::Sell, 50000, 5)).unwrap();
        sender.try_enqueue(submit("BTC-USD", Side::Buy, 50000, 5)).unwrap();
        sender.try_enqueue(EngineCommand::Cancel { order_id: 999 }).unwrap();
        drop(sender);

        run_consumer(receiver, engine.clone());

        let stats = engine.stats();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_trades, 1);
        assert_eq!(stats.active_orders, 0);
    }
}
