//! pinwheel-rebalancer: command-line workflows around the pinwheel core.
//!
//! Loads an allocation hierarchy and current balances, computes how much to
//! contribute to each category to reach a net-worth goal, and records every
//! run in a JSONL audit trail. Also compiles aligned price histories and
//! prepares chart data.

pub mod audit;
pub mod chart;
pub mod config;
pub mod error;
pub mod prices;
pub mod workflow;
