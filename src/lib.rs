// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Core execution engines for a link-graph crawling platform.
//!
//! This crate owns two reusable engines:
//!
//! * [`pipeline`] — a generic, multi-stage payload processor with pluggable
//!   stage topologies (serial, fixed-width pool, elastic pool, broadcast).
//! * [`bsp`] — a bulk-synchronous-parallel graph engine executing
//!   vertex-local compute functions across supersteps, Pregel-style.
//!
//! Everything specific to crawling — fetching pages, extracting links and
//! text, indexing, and storage — is built on top of these engines by
//! plugging in [`pipeline::Processor`], [`pipeline::Source`],
//! [`pipeline::Sink`] and [`bsp::ComputeFn`] implementations. None of that
//! is part of this crate.

pub mod bsp;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod traits;
