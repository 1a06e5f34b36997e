// Library crate for integration tests
// Re-exports all modules needed for testing

pub mod aggregator;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod indicator;
pub mod market;
pub mod notify;
pub mod scanner;
pub mod series;
pub mod types;
