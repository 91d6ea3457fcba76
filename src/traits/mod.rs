// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Convenience re-exports of the external collaborator contracts (spec §4.I):
//! the handful of traits crawler-side code implements to plug into the two
//! engines owned by this crate.

pub use crate::bsp::{ComputeFn, Relayer};
pub use crate::pipeline::{Payload, Processor, Sink, Source};
