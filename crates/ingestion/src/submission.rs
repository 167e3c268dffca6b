//! Chunked submission of work items to the job store.
//!
//! Work items are pulled lazily from a stream, converted to tasks and sent in
//! fixed-size chunks. The first chunk creates the job; later chunks are
//! appended to it. Once a job exists, any failure marks it `FAILED` before
//! the error is returned, so a half-submitted job is never left running.

use futures::{pin_mut, Stream, StreamExt};
use job_store::{JobId, JobStatus, JobStore, NewJob, NewTask};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{IngestionError, Result};

/// Outcome of one submission run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    /// `None` when the stream produced no items.
    pub job_id: Option<JobId>,
    pub tasks_submitted: usize,
    pub chunks_submitted: usize,
}

pub struct TaskSubmissionPipeline<'a> {
    store: &'a dyn JobStore,
    batch_size: usize,
}

impl<'a> TaskSubmissionPipeline<'a> {
    pub fn new(store: &'a dyn JobStore, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(IngestionError::InvalidConfig(
                "task batch size must be > 0".to_string(),
            ));
        }
        Ok(Self { store, batch_size })
    }

    /// Submit every item of `items` as a task of `task_type` under one job
    /// described by `job`.
    ///
    /// Store calls are issued one at a time, in stream order.
    pub async fn submit<T, S, E>(
        &self,
        job: &NewJob,
        task_type: &str,
        items: S,
    ) -> Result<SubmissionSummary>
    where
        T: Serialize,
        S: Stream<Item = std::result::Result<T, E>>,
        E: Into<IngestionError>,
    {
        pin_mut!(items);
        let mut summary = SubmissionSummary::default();
        let mut chunk = Vec::with_capacity(self.batch_size);

        while let Some(item) = items.next().await {
            let task: Result<NewTask> = item.map_err(Into::into).and_then(|params| {
                NewTask::from_parameters(task_type, &params).map_err(IngestionError::from)
            });
            match task {
                Ok(task) => chunk.push(task),
                Err(e) => return Err(self.fail_job(summary.job_id, e).await),
            }

            if chunk.len() == self.batch_size {
                let full = std::mem::replace(&mut chunk, Vec::with_capacity(self.batch_size));
                if let Err(e) = self.send_chunk(job, full, &mut summary).await {
                    return Err(self.fail_job(summary.job_id, e).await);
                }
            }
        }

        if !chunk.is_empty() {
            if let Err(e) = self.send_chunk(job, chunk, &mut summary).await {
                return Err(self.fail_job(summary.job_id, e).await);
            }
        }

        Ok(summary)
    }

    async fn send_chunk(
        &self,
        job: &NewJob,
        tasks: Vec<NewTask>,
        summary: &mut SubmissionSummary,
    ) -> Result<()> {
        let count = tasks.len();
        match summary.job_id {
            None => {
                let job_id = self.store.create_job(job, tasks).await?;
                info!(
                    job_id = %job_id,
                    resource_id = %job.resource_id,
                    job_type = %job.job_type,
                    tasks = count,
                    "Created job"
                );
                summary.job_id = Some(job_id);
            }
            Some(job_id) => {
                self.store.add_tasks(&job_id, tasks).await?;
                debug!(job_id = %job_id, tasks = count, "Appended tasks");
            }
        }
        summary.tasks_submitted += count;
        summary.chunks_submitted += 1;
        Ok(())
    }

    /// Mark the job failed, if one was created, and hand back the error the
    /// caller should see.
    async fn fail_job(&self, job_id: Option<JobId>, cause: IngestionError) -> IngestionError {
        let Some(job_id) = job_id else {
            return cause;
        };

        error!(job_id = %job_id, error = %cause, "Task submission failed, marking job as failed");
        let reason = cause.to_string();
        match self
            .store
            .set_job_status(&job_id, JobStatus::Failed, Some(&reason))
            .await
        {
            Ok(()) => cause,
            Err(status_error) => {
                error!(
                    job_id = %job_id,
                    error = %status_error,
                    cause = %cause,
                    "Failed to mark job as failed"
                );
                status_error.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use job_store::InMemoryJobStore;

    #[test]
    fn test_zero_batch_size_rejected() {
        let store = InMemoryJobStore::new();
        assert!(matches!(
            TaskSubmissionPipeline::new(&store, 0),
            Err(IngestionError::InvalidConfig(_))
        ));
    }
}
