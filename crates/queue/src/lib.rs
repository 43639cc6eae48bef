//! Client library for the remote job queue.
//!
//! Provides the [`JobService`] seam the tracker polls through, and
//! [`JobQueueApi`], its HTTP implementation against the job queue's
//! REST endpoints.

pub mod api;
pub mod config;
pub mod service;

pub use api::{JobQueueApi, QueueError};
pub use config::QueueConfig;
pub use service::JobService;
