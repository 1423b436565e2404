//! Traffic analysis and bandwidth monitoring engine
//!
//! Drives pairwise throughput probes across a fixed set of endpoints, samples
//! their interface counters over a monitoring window, and aggregates both into
//! a JSON report. Endpoint command execution is abstracted behind
//! [`runner::CommandRunner`].

pub mod analyzer;
pub mod cancel;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod errors;
pub mod models;
pub mod probes;
pub mod reporting;
pub mod runner;

pub use analyzer::{CampaignPlan, TrafficAnalyzer};
pub use config::AnalyzerConfig;
