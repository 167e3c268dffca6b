//! Job store double that records every call and fails on request.

use std::sync::Mutex;

use async_trait::async_trait;
use job_store::{
    InMemoryJobStore, Job, JobId, JobQuery, JobStatus, JobStore, JobStoreError, NewJob, NewTask,
};

/// One call made against a [`ScriptedJobStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    CreateJob { tasks: usize },
    AddTasks { job_id: JobId, tasks: usize },
    SetStatus { job_id: JobId, status: JobStatus, reason: Option<String> },
    FindJobs,
}

#[derive(Debug, Default)]
struct Script {
    fail_create: bool,
    fail_add_tasks_on: Option<usize>,
    fail_set_status: bool,
    add_tasks_calls: usize,
}

/// In-memory store wrapper that logs calls and injects failures.
#[derive(Debug, Default)]
pub struct ScriptedJobStore {
    inner: InMemoryJobStore,
    calls: Mutex<Vec<StoreCall>>,
    script: Mutex<Script>,
}

impl ScriptedJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every `create_job` call.
    pub fn fail_create(self) -> Self {
        self.script.lock().unwrap().fail_create = true;
        self
    }

    /// Reject the `n`th `add_tasks` call, counting from 1.
    pub fn fail_add_tasks_on(self, n: usize) -> Self {
        self.script.lock().unwrap().fail_add_tasks_on = Some(n);
        self
    }

    /// Reject every `set_job_status` call.
    pub fn fail_set_status(self) -> Self {
        self.script.lock().unwrap().fail_set_status = true;
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matcher: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matcher(*c)).count()
    }

    /// Seed a job directly, bypassing the call log.
    pub async fn seed_job(&self, job: &NewJob, status: JobStatus) -> JobId {
        let job_id = self.inner.create_job(job, Vec::new()).await.unwrap();
        if status != JobStatus::InProgress {
            self.inner.set_job_status(&job_id, status, None).await.unwrap();
        }
        job_id
    }

    pub async fn get_job(&self, job_id: &JobId) -> Option<Job> {
        self.inner.get_job(job_id).await
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl JobStore for ScriptedJobStore {
    async fn create_job(&self, job: &NewJob, tasks: Vec<NewTask>) -> job_store::Result<JobId> {
        self.record(StoreCall::CreateJob { tasks: tasks.len() });
        if self.script.lock().unwrap().fail_create {
            return Err(JobStoreError::Backend("create_job rejected".to_string()));
        }
        self.inner.create_job(job, tasks).await
    }

    async fn add_tasks(&self, job_id: &JobId, tasks: Vec<NewTask>) -> job_store::Result<()> {
        self.record(StoreCall::AddTasks {
            job_id: *job_id,
            tasks: tasks.len(),
        });
        let fail = {
            let mut script = self.script.lock().unwrap();
            script.add_tasks_calls += 1;
            script.fail_add_tasks_on == Some(script.add_tasks_calls)
        };
        if fail {
            return Err(JobStoreError::Backend("add_tasks rejected".to_string()));
        }
        self.inner.add_tasks(job_id, tasks).await
    }

    async fn set_job_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        reason: Option<&str>,
    ) -> job_store::Result<()> {
        self.record(StoreCall::SetStatus {
            job_id: *job_id,
            status,
            reason: reason.map(str::to_string),
        });
        if self.script.lock().unwrap().fail_set_status {
            return Err(JobStoreError::Backend("set_job_status rejected".to_string()));
        }
        self.inner.set_job_status(job_id, status, reason).await
    }

    async fn find_jobs(&self, query: &JobQuery) -> job_store::Result<Vec<Job>> {
        self.record(StoreCall::FindJobs);
        self.inner.find_jobs(query).await
    }
}
