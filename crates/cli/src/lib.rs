//! RiskWatch CLI - operator commands over a JSON dataset directory
//!
//! This crate provides the `riskwatch` binary and command orchestration.

pub mod commands;
pub mod context;

pub use context::AppContext;
