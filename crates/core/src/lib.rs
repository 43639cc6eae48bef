//! Shared domain types for the urbanflow job tracking workspace.
//!
//! Holds the vocabulary every other crate speaks: remote job
//! identifiers and statuses, batch health, the typed work requests the
//! job queue accepts, and the common error type.

pub mod config;
pub mod error;
pub mod job;
pub mod request;
pub mod types;

pub use error::CoreError;
pub use job::{Health, JobStatus};
pub use request::{InvestModel, WorkRequest};
pub use types::{JobId, Timestamp};
