//! The job store seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Job, JobId, JobQuery, JobStatus, NewJob, NewTask};

/// External job tracking service.
///
/// Calls for one job are issued strictly in sequence by the caller.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job in `IN_PROGRESS` with its first chunk of tasks.
    async fn create_job(&self, job: &NewJob, tasks: Vec<NewTask>) -> Result<JobId>;

    /// Append a chunk of tasks to an existing job.
    async fn add_tasks(&self, job_id: &JobId, tasks: Vec<NewTask>) -> Result<()>;

    /// Move a job to `status`, optionally recording why.
    async fn set_job_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        reason: Option<&str>,
    ) -> Result<()>;

    /// Jobs for one resource version, product type and job type.
    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<Job>>;
}
