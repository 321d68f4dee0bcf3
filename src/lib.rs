//! Skycast library
//!
//! Weather forecasts backed by a two-tier cache: a bounded in-memory map in
//! front of JSON files on disk, with TTL validity checks and stale-on-failure
//! fallback. The binary in `main.rs` is a thin composition root over these
//! modules.

pub mod cache;
pub mod cli;
pub mod data;
pub mod fetch;
pub mod geocode;
