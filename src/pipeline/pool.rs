// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Payload pool (spec §4.H): a free list of recycled payloads.
//!
//! Crawler payloads carry a page's raw HTML buffer; recycling them avoids
//! transient allocation pressure under sustained throughput. The spec
//! describes this as process-wide state, but notes that an implementation
//! may scope the pool to a single pipeline instance when test determinism
//! matters more than shaving allocations — that's the tradeoff this type
//! makes (see DESIGN.md). Callers that want a process-wide pool can still
//! get one by stashing a `Pool<P>` behind a `std::sync::OnceLock`.

use std::sync::Mutex;

use super::payload::Payload;

/// A reusable free list of `P` instances.
///
/// `acquire` hands out a recycled instance if one is available, otherwise
/// it builds a fresh one via the factory. Callers are expected to wire a
/// payload's `mark_as_processed` to call [`Pool::release`] on itself once
/// its fields have been reset to a zero state.
pub struct Pool<P: Payload> {
    free: Mutex<Vec<P>>,
    factory: Box<dyn Fn() -> P + Send + Sync>,
}

impl<P: Payload> Pool<P> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
    {
        Self {
            free: Mutex::new(Vec::new()),
            factory: Box::new(factory),
        }
    }

    /// Take a payload from the free list, or build a new one.
    pub fn acquire(&self) -> P {
        match self.free.lock().unwrap().pop() {
            Some(payload) => payload,
            None => (self.factory)(),
        }
    }

    /// Return a payload to the free list for future reuse.
    pub fn release(&self, payload: P) {
        self.free.lock().unwrap().push(payload);
    }

    /// Number of instances currently sitting idle in the free list.
    pub fn idle_count(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Counted(u32);

    impl Payload for Counted {
        fn mark_as_processed(&mut self) {
            self.0 = 0;
        }
    }

    #[test]
    fn acquire_reuses_released_instances() {
        let pool = Pool::new(|| Counted(1));
        let a = pool.acquire();
        assert_eq!(a.0, 1);
        pool.release(a);
        assert_eq!(pool.idle_count(), 1);

        let b = pool.acquire();
        assert_eq!(pool.idle_count(), 0);
        pool.release(b);
    }

    #[test]
    fn acquire_on_empty_pool_builds_fresh_instance() {
        let pool = Pool::new(|| Counted(7));
        assert_eq!(pool.idle_count(), 0);
        let p = pool.acquire();
        assert_eq!(p.0, 7);
    }
}
