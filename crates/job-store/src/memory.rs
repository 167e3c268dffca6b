//! In-process job store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{JobStoreError, Result};
use crate::store::JobStore;
use crate::types::{Job, JobId, JobQuery, JobStatus, NewJob, NewTask, Task};

/// Job store keeping every job in memory.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one job.
    pub async fn get_job(&self, job_id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Number of stored jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, job: &NewJob, tasks: Vec<NewTask>) -> Result<JobId> {
        let job = Job::new(job.clone(), tasks);
        let job_id = job.id;
        info!(
            job_id = %job_id,
            resource_id = %job.meta.resource_id,
            tasks = job.tasks.len(),
            "Created job"
        );
        self.jobs.write().await.insert(job_id, job);
        Ok(job_id)
    }

    async fn add_tasks(&self, job_id: &JobId, tasks: Vec<NewTask>) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or(JobStoreError::JobNotFound(*job_id))?;
        if job.status.is_terminal() {
            return Err(JobStoreError::JobClosed {
                job_id: *job_id,
                status: job.status,
            });
        }

        debug!(job_id = %job_id, tasks = tasks.len(), "Adding tasks");
        job.tasks.extend(tasks.into_iter().map(Task::new));
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn set_job_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or(JobStoreError::JobNotFound(*job_id))?;
        if job.status.is_terminal() && job.status != status {
            return Err(JobStoreError::InvalidTransition {
                job_id: *job_id,
                from: job.status,
                to: status,
            });
        }

        info!(job_id = %job_id, from = ?job.status, to = ?status, "Updating job status");
        job.status = status;
        job.reason = reason.map(str::to_string);
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut found: Vec<Job> = jobs.values().filter(|job| job.matches(query)).cloned().collect();
        found.sort_by_key(|job| job.created_at);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn meta(resource_id: &str) -> NewJob {
        NewJob {
            resource_id: resource_id.to_string(),
            version: "1.0".to_string(),
            job_type: "Ingestion_Update".to_string(),
            product_type: "Orthophoto".to_string(),
            product_name: resource_id.to_string(),
            domain: "RASTER".to_string(),
            description: String::new(),
            parameters: serde_json::json!({}),
        }
    }

    fn task(n: u32) -> NewTask {
        NewTask {
            task_type: "tilesMerging".to_string(),
            parameters: serde_json::json!({ "n": n }),
        }
    }

    #[tokio::test]
    async fn test_create_and_append() {
        let store = InMemoryJobStore::new();
        let job_id = store.create_job(&meta("a"), vec![task(1), task(2)]).await.unwrap();
        assert_ok!(store.add_tasks(&job_id, vec![task(3)]).await);

        let job = store.get_job(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        let order: Vec<_> = job.tasks.iter().map(|t| t.parameters["n"].clone()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_add_tasks_to_unknown_job() {
        let store = InMemoryJobStore::new();
        let result = store.add_tasks(&uuid::Uuid::new_v4(), vec![task(1)]).await;
        assert!(matches!(result, Err(JobStoreError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_job_is_closed() {
        let store = InMemoryJobStore::new();
        let job_id = store.create_job(&meta("a"), vec![task(1)]).await.unwrap();
        assert_ok!(
            store
                .set_job_status(&job_id, JobStatus::Failed, Some("boom"))
                .await
        );

        let job = store.get_job(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.reason.as_deref(), Some("boom"));

        assert_err!(store.add_tasks(&job_id, vec![task(2)]).await);
        assert_err!(
            store
                .set_job_status(&job_id, JobStatus::InProgress, None)
                .await
        );
    }

    #[tokio::test]
    async fn test_find_jobs_filters_by_resource() {
        let store = InMemoryJobStore::new();
        store.create_job(&meta("a"), vec![task(1)]).await.unwrap();
        store.create_job(&meta("b"), vec![task(1)]).await.unwrap();

        let query = JobQuery {
            resource_id: "a".to_string(),
            version: "1.0".to_string(),
            product_type: "Orthophoto".to_string(),
            job_type: "Ingestion_Update".to_string(),
        };
        let found = store.find_jobs(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].meta.resource_id, "a");
        assert_eq!(store.job_count().await, 2);
    }
}
