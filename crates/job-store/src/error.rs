//! Error types for job store operations.

use thiserror::Error;

use crate::types::{JobId, JobStatus};

#[derive(Error, Debug)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job {job_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Cannot add tasks to job {job_id} in status {status:?}")]
    JobClosed { job_id: JobId, status: JobStatus },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job store backend error: {0}")]
    Backend(String),
}

/// Result type for job store operations.
pub type Result<T> = std::result::Result<T, JobStoreError>;
