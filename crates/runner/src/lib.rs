//! `urbanflow-runner` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod cli;
pub mod logging;
pub mod report;
pub mod run;
