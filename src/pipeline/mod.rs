// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The staged payload-processing pipeline engine (spec §4): a linear
//! Source → Stage₀ → … → Stageₙ₋₁ → Sink run, where each stage runs under
//! a pluggable scheduling strategy ([`stage::Fifo`], [`stage::FixedPool`],
//! [`stage::ElasticPool`], [`stage::Broadcast`]).

mod driver;
mod error;
#[cfg(test)]
mod integration_tests;
mod payload;
mod pool;
pub mod stage;
mod traits;

pub use driver::Pipeline;
pub use error::{PipelineError, ProcessError, SharedError};
pub use payload::{Outcome, Payload, ProcessFailure};
pub use pool::Pool;
pub use traits::{Processor, Sink, Source};
