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

//! Wire envelopes for the broker boundary
//!
//! The transport itself lives outside this crate; these are the shapes
//! it carries. Submissions and cancellations arrive on partitioned
//! topics keyed by instrument, so one partition serializes one
//! instrument's flow; trades leave keyed the same way. `request_id` is
//! the client-supplied deduplication handle for at-least-once delivery;
//! deduplication happens at the consumer, not in the engine.

use serde::{Deserialize, Serialize};

use crate::ingress::EngineCommand;
use crate::order::{ClientId, OrderId, Price, Quantity, Side};
use crate::trade::{Trade, TradeId};

/// New-order envelope from the orders topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub request_id: u64,
    pub client_id: ClientId,
    pub instrument: String,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl SubmitRequest {
    /// Broker partition key; one partition per instrument keeps
    /// per-instrument total order.
    pub fn partition_key(&self) -> &str {
        &self.instrument
    }

    pub fn decode(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl From<SubmitRequest> for EngineCommand {
    fn from(request: SubmitRequest) -> Self {
        EngineCommand::Submit {
            client_id: request.client_id,
            instrument: request.instrument,
            side: request.side,
            price: request.price,
            quantity: request.quantity,
        }
    }
}

/// Cancel envelope from the cancels topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub request_id: u64,
    pub order_id: OrderId,
}

impl CancelRequest {
    pub fn decode(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl From<CancelRequest> for EngineCommand {
    fn from(request: CancelRequest) -> Self {
        EngineCommand::Cancel {
            order_id: request.order_id,
        }
    }
}

/// Trade envelope published on the trades topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMessage {
    pub trade_id: TradeId,
    pub instrument: String,
    pub price: Price,
    pub quantity: Quantity,
    pub value: u64,
    pub taker_order_id: OrderId,
    pub maker_order_id: OrderId,
    pub taker_client_id: ClientId,
    pub maker_client_id: ClientId,
    pub timestamp: u64,
}

impl TradeMessage {
    pub fn from_trade(trade: &Trade) -> Self {
        Self {
            trade_id: trade.trade_id,
            instrument: trade.instrument.clone(),
            price: trade.price,
            quantity: trade.quantity,
            value: trade.value(),
            taker_order_id: trade.taker_order_id,
            maker_order_id: trade.maker_order_id,
            taker_client_id: trade.taker_client_id,
            maker_client_id: trade.maker_client_id,
            timestamp: trade.timestamp,
        }
    }

    pub fn partition_key(&self) -> &str {
        &self.instrument
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_round_trip() {
        let request = SubmitRequest {
            request_id: 42,
            client_id: 100,
            instrument: "BTC-USD".to_string(),
            side: Side::Buy,
            price: 50000,
            quantity: 10,
        };

        let payload = request.encode().unwrap();
        let decoded = SubmitRequest::decode(&payload).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.partition_key(), "BTC-USD");
    }

    #[test]
    fn test_submit_request_into_command() {
        let request = SubmitRequest {
            request_id: 42,
            client_id: 100,
            instrument: "BTC-USD".to_string(),
            side: Side::Sell,
            price: 50000,
            quantity: 10,
        };

        let command: EngineCommand = request.into();
        match command {
            EngineCommand::Submit {
                client_id,
                instrument,
                side,
                ..
            } => {
                assert_eq!(client_id, 100);
                assert_eq!(instrument, "BTC-USD");
                assert_eq!(side, Side::Sell);
            }
            _ => panic!("expected submit command"),
        }
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(SubmitRequest::decode(b"not json").is_err());
        assert!(CancelRequest::decode(b"{}").is_err());
    }

    #[test]
    fn test_trade_message_carries_value() {
        let trade = Trade {
            trade_id: 1,
            instrument: "BTC-USD".to_string(),
            price: 50000,
            quantity: 3,
            taker_order_id: 2,
            maker_order_id: 1,
            taker_client_id: 101,
            maker_client_id: 100,
            timestamp: 1000,
        };

        let message = TradeMessage::from_trade(&trade);
        assert_eq!(message.value, 150_000);
        assert_eq!(message.partition_key(), "BTC-USD");
    }
}
