//! Raster ingestion task planner.
//!
//! Reads an ingestion request, plans its tiling tasks and submits them to a
//! job store.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ingestion::{Ingester, IngestionRequest, TaskerConfig};
use job_store::{InMemoryJobStore, JobId, JobStatus};
use serde::Serialize;
use tracing::info;

/// What the planner prints after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: Option<JobId>,
    pub resource_id: String,
    pub version: String,
    pub job_type: Option<String>,
    pub status: Option<JobStatus>,
    pub task_count: usize,
    pub chunks_submitted: usize,
}

/// Load configuration from `path`, or from `TASKER_*` environment variables
/// when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<TaskerConfig> {
    let config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            TaskerConfig::from_yaml_file(path)?
        }
        None => {
            let config = TaskerConfig::from_env();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

pub fn read_request(path: &Path) -> Result<IngestionRequest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid ingestion request in {}", path.display()))
}

/// Plan and submit `request`, then describe the resulting job.
pub async fn run(
    config: TaskerConfig,
    request: &IngestionRequest,
    store: Arc<InMemoryJobStore>,
) -> Result<JobReport> {
    let ingester = Ingester::new(config, store.clone())?;
    let summary = ingester.ingest(request).await?;

    let job = match summary.job_id {
        Some(job_id) => store.get_job(&job_id).await,
        None => None,
    };
    let product = request.product();

    Ok(JobReport {
        job_id: summary.job_id,
        resource_id: product.product_id.clone(),
        version: product.product_version.clone(),
        job_type: job.as_ref().map(|job| job.meta.job_type.clone()),
        status: job.as_ref().map(|job| job.status),
        task_count: job.as_ref().map_or(0, |job| job.tasks.len()),
        chunks_submitted: summary.chunks_submitted,
    })
}
