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

use serde::{Deserialize, Serialize};

/// Aggregate engine counters
///
/// `total_orders` counts submissions that passed validation;
/// `active_orders` equals submitted minus filled minus cancelled at all
/// times. Counters are updated under the engine's stats lock, so a
/// reader never observes a mid-transition value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_orders: u64,
    pub active_orders: u64,
    pub total_trades: u64,
    pub cancelled_orders: u64,
    pub rejected_orders: u64,
}
