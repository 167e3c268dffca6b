//! Job and task payloads exchanged with the job store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JobId = Uuid;

/// Lifecycle status shared by jobs and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs accept no further changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Pending and in-progress jobs still own their resource.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// Metadata for a job about to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub resource_id: String,
    pub version: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub product_type: String,
    pub product_name: String,
    pub domain: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A task about to be appended to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(rename = "type")]
    pub task_type: String,
    pub parameters: serde_json::Value,
}

impl NewTask {
    /// Serialize `parameters` into a task of `task_type`.
    pub fn from_parameters<T: Serialize>(
        task_type: impl Into<String>,
        parameters: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            task_type: task_type.into(),
            parameters: serde_json::to_value(parameters)?,
        })
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub task_type: String,
    pub parameters: serde_json::Value,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(task: NewTask) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type: task.task_type,
            parameters: task.parameters,
            status: JobStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// A persisted job with its tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(flatten)]
    pub meta: NewJob,
    pub status: JobStatus,
    pub reason: Option<String>,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A job created together with its first chunk of tasks.
    pub fn new(meta: NewJob, tasks: Vec<NewTask>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            meta,
            status: JobStatus::InProgress,
            reason: None,
            tasks: tasks.into_iter().map(Task::new).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn matches(&self, query: &JobQuery) -> bool {
        self.meta.resource_id == query.resource_id
            && self.meta.version == query.version
            && self.meta.product_type == query.product_type
            && self.meta.job_type == query.job_type
    }
}

/// Lookup of jobs for one resource version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQuery {
    pub resource_id: String,
    pub version: String,
    pub product_type: String,
    #[serde(rename = "type")]
    pub job_type: String,
}
