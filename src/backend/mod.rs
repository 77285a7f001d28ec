// src/backend/mod.rs

//! Job execution backend.
//!
//! - [`job`] defines the payload/result types that cross process boundaries.
//! - [`spool`] is the directory queue shared by submitters and workers.
//! - [`worker`] is the consumer loop behind worker mode.

pub mod job;
pub mod spool;
pub mod worker;

pub use job::{JobId, JobInput, JobPayload, JobResult, JobStatus};
pub use spool::SpoolQueue;
pub use worker::Worker;
