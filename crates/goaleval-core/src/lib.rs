//! Goal-based evaluation harness for conversational agents.
//!
//! Drives a live agent endpoint through a declarative set of test cases,
//! decides PASS/FAIL/ERROR per case with a pluggable evaluation strategy
//! (substring match, LLM judge, verification script), and aggregates the
//! outcomes into a report and a binary exit status.

pub mod client;
pub mod config;
pub mod errors;
pub mod filter;
pub mod judge;
pub mod model;
pub mod report;
pub mod runner;
pub mod strategy;

pub use config::{EndpointType, HarnessConfig};
pub use errors::HarnessError;
pub use model::{EvalOutcome, EvalResult, EvalType, RunSummary, TestCase};
pub use runner::Runner;
