//! Error types for the ingestion crate.

use job_store::{JobId, JobStatus, JobStoreError};
use thiserror::Error;
use tiling::TilingError;

/// Errors that can occur while planning or submitting ingestion work.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error(transparent)]
    Tiling(#[from] TilingError),

    #[error("Job store request failed: {0}")]
    JobStore(#[from] JobStoreError),

    #[error("Job {job_id} for {resource_id} version {version} is still {status:?}")]
    ConflictingJob {
        job_id: JobId,
        resource_id: String,
        version: String,
        status: JobStatus,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to serialize task parameters: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
