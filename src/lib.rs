pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod protocol;
pub mod reporting;
pub mod sandbox;
pub mod scoring;
pub mod suites;
pub mod transport;
pub mod utils;
