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

use criterion::{Criterion, criterion_group, criterion_main};

use quasar_matching::{MatchingEngine, Side};

const DEEP_BOOK_LEVELS: u64 = 10_000;

/// Resting orders only: every submit lands away from the touch.
fn bench_no_cross(c: &mut Criterion) {
    c.bench_function("submit_no_cross", |b| {
        let engine = MatchingEngine::new();
        let mut price = 1;
        b.iter(|| {
            // Alternate sides on disjoint price ranges so nothing matches
            engine
                .submit(1, "BTC-USD", Side::Buy, 40000 + (price % 1000), 1)
                .unwrap();
            engine
                .submit(2, "BTC-USD", Side::Sell, 60000 + (price % 1000), 1)
                .unwrap();
            price += 1;
        });
    });
}

/// Every second submit crosses the order posted just before it.
fn bench_cross_heavy(c: &mut Criterion) {
    c.bench_function("submit_cross_heavy", |b| {
        let engine = MatchingEngine::new();
        engine.set_trade_sink(std::sync::Arc::new(|_: &quasar_matching::Trade| {}));
        b.iter(|| {
            engine.submit(1, "BTC-USD", Side::Buy, 50000, 1).unwrap();
            engine.submit(2, "BTC-USD", Side::Sell, 50000, 1).unwrap();
        });
    });
}

/// Takers sweeping the touch of a pre-built deep book.
fn bench_deep_book(c: &mut Criterion) {
    c.bench_function("submit_deep_book", |b| {
        let engine = MatchingEngine::new();
        for i in 0..DEEP_BOOK_LEVELS {
            engine
                .submit(1, "BTC-USD", Side::Sell, 50000 + i, 10)
                .unwrap();
        }
        b.iter(|| {
            engine.submit(2, "BTC-USD", Side::Buy, 60000, 10).unwrap();
        });
    });
}

criterion_group!(benches, bench_no_cross, bench_cross_heavy, bench_deep_book);
criterion_main!(benches);
