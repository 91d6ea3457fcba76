// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Re-exports of the error types owned by each engine module, gathered here
//! for callers that want a single `use` line.

pub use crate::bsp::{ConfigError, GraphError};
pub use crate::pipeline::PipelineError;
