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

use serde::{Deserialize, Serialize};

/// Component name used for log file naming
pub const LOG_COMPONENT_NAME: &str = "matching";
/// Default log level when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn default_book_depth() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    100_000
}

/// Matching service configuration
///
/// Covers only the service shell; the engine itself takes no
/// construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Broker bootstrap servers
    pub brokers: String,
    /// Client id reported to the broker
    pub client_id: String,
    /// Topic carrying new-order envelopes, partitioned by instrument
    pub orders_topic: String,
    /// Topic carrying cancel envelopes
    pub cancels_topic: String,
    /// Topic trade messages are published to
    pub trades_topic: String,
    /// Depth returned by book-state queries
    #[serde(default = "default_book_depth")]
    pub book_depth: usize,
    /// Capacity of the command ingress queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            client_id: "quasar-matching".to_string(),
            orders_topic: "orders.new".to_string(),
            cancels_topic: "orders.cancel".to_string(),
            trades_topic: "trades".to_string(),
            book_depth: default_book_depth(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("MATCHING"))
            .build()?;

        cfg.try_deserialize()
    }

    /// Load configuration from file, with environment overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MATCHING"))
            .build()?;

        cfg.try_deserialize()
    }
}
