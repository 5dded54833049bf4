// Copyright 2025 chenjjiaa
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

//! Matching engine service entry point
//!
//! Wires the engine to its collaborators: the command queue the broker
//! consumer feeds, and the bounded trade queue the broker publisher
//! drains. The transports themselves are separate processes; their
//! absence here only means the queues idle.

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::info;

use quasar_matching::{
    ChannelSink, CommandQueue, MatchingEngine, ServiceConfig, TradeMessage, ingress, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let config = ServiceConfig::from_env().unwrap_or_default();
    info!("Quasar matching engine starting");
    info!(
        brokers = %config.brokers,
        orders_topic = %config.orders_topic,
        cancels_topic = %config.cancels_topic,
        trades_topic = %config.trades_topic,
        "configuration loaded"
    );

    let engine = Arc::new(MatchingEngine::new());

    // Trade egress: bounded hand-off drained by the publisher thread
    let (sink, trade_receiver) = ChannelSink::new(config.queue_capacity);
    engine.set_trade_sink(Arc::new(sink));

    let trades_topic = config.trades_topic.clone();
    let publisher = std::thread::Builder::new()
        .name("trade-publisher".to_string())
        .spawn(move || {
            while let Some(trade) = trade_receiver.recv() {
                let message = TradeMessage::from_trade(&trade);
                match message.encode() {
                    Ok(payload) => info!(
                        topic = %trades_topic,
                        key = message.partition_key(),
                        bytes = payload.len(),
                        "trade ready for publish"
                    ),
                    Err(e) => tracing::error!(error = %e, "failed to encode trade"),
                }
            }
        })?;

    // Command ingress: the broker consumer clones the sender per
    // partition handler; the consumer thread applies in arrival order
    let (command_sender, command_receiver) = CommandQueue::new(config.queue_capacity).split();
    let consumer_engine = engine.clone();
    let consumer = std::thread::Builder::new()
        .name("command-consumer".to_string())
        .spawn(move || ingress::run_consumer(command_receiver, consumer_engine))?;

    info!("matching engine ready");

    signal::ctrl_c().await?;
    info!("shutdown signal received");

    engine.drain();
    drop(command_sender);
    consumer
        .join()
        .map_err(|_| anyhow::anyhow!("command consumer panicked"))?;

    let stats = engine.stats();
    info!(
        total_orders = stats.total_orders,
        total_trades = stats.total_trades,
        active_orders = stats.active_orders,
        "final statistics"
    );

    drop(engine);
    publisher
        .join()
        .map_err(|_| anyhow::anyhow!("trade publisher panicked"))?;

    Ok(())
}
