// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named, concurrent-safe reducers with delta tracking (spec §4.B).
//!
//! The registry is heterogeneous by design — a graph may register a
//! counter alongside a min/max tracker under different names — so the
//! trait trades in `Box<dyn Any + Send + Sync>` the way the reference
//! implementation trades in `interface{}`. Callers downcast after a
//! `registry.get(name)` lookup, same as any other opaque-by-name plugin
//! registry.

use std::any::Any;
use std::sync::Mutex;

/// A named reducer. Implementations must serialize mutations internally —
/// every method takes `&self`.
pub trait Aggregator: Send + Sync {
    fn aggregator_type(&self) -> &str;
    fn set(&self, value: Box<dyn Any + Send + Sync>);
    fn get(&self) -> Box<dyn Any + Send + Sync>;
    fn aggregate(&self, value: Box<dyn Any + Send + Sync>);
    /// Returns the change accumulated since the previous call to `delta`,
    /// then resets the private counter. Successive calls with no
    /// intervening `aggregate` return the operator's identity value.
    fn delta(&self) -> Box<dyn Any + Send + Sync>;
}

/// A reference counter aggregator over `i64`, summing every aggregated
/// value. `delta` resets to `0` (the identity for addition).
#[derive(Default)]
pub struct Int64Aggregator {
    state: Mutex<Int64State>,
}

#[derive(Default)]
struct Int64State {
    total: i64,
    since_delta: i64,
}

impl Int64Aggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

fn expect_i64(value: Box<dyn Any + Send + Sync>) -> i64 {
    *value
        .downcast::<i64>()
        .expect("Int64Aggregator requires i64 values")
}

impl Aggregator for Int64Aggregator {
    fn aggregator_type(&self) -> &str {
        "int64.sum"
    }

    fn set(&self, value: Box<dyn Any + Send + Sync>) {
        let value = expect_i64(value);
        let mut state = self.state.lock().unwrap();
        state.total = value;
        state.since_delta = value;
    }

    fn get(&self) -> Box<dyn Any + Send + Sync> {
        Box::new(self.state.lock().unwrap().total)
    }

    fn aggregate(&self, value: Box<dyn Any + Send + Sync>) {
        let value = expect_i64(value);
        let mut state = self.state.lock().unwrap();
        state.total += value;
        state.since_delta += value;
    }

    fn delta(&self) -> Box<dyn Any + Send + Sync> {
        let mut state = self.state.lock().unwrap();
        let delta = state.since_delta;
        state.since_delta = 0;
        Box::new(delta)
    }
}
