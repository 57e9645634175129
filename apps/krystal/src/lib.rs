//! # Krystal Application Library
//!
//! The async, network-aware half of Krystal: HTTP API, CLI, configuration,
//! data-source clients and the news investigation pipeline. The analysis
//! itself lives in `krystal-core`.

pub mod api;
pub mod cli;
pub mod config;
pub mod investigate;
pub mod sources;
