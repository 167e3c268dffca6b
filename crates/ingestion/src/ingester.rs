//! Ingestion orchestration.

use std::sync::Arc;

use futures::stream;
use job_store::{JobQuery, JobStore, NewJob};
use serde_json::json;
use tiling::{
    zoom_for_resolution, MergeBatchGenerator, NewLayerSource, SingleLayerTiler,
    ZoomRangeCalculator,
};
use tracing::{info, instrument, warn};

use crate::config::TaskerConfig;
use crate::error::{IngestionError, Result};
use crate::request::{IngestionRequest, NewLayerRequest, ProductInfo, UpdateLayerRequest};
use crate::submission::{SubmissionSummary, TaskSubmissionPipeline};

/// Turns ingestion requests into jobs in the job store.
pub struct Ingester {
    config: TaskerConfig,
    zoom_calculator: ZoomRangeCalculator,
    store: Arc<dyn JobStore>,
}

impl Ingester {
    /// Create a new Ingester after validating `config`.
    pub fn new(config: TaskerConfig, store: Arc<dyn JobStore>) -> Result<Self> {
        config.validate()?;
        let zoom_calculator = config.zoom_calculator()?;
        Ok(Self {
            config,
            zoom_calculator,
            store,
        })
    }

    /// Route a request to the matching ingestion path.
    pub async fn ingest(&self, request: &IngestionRequest) -> Result<SubmissionSummary> {
        match request {
            IngestionRequest::New(request) => self.ingest_new_layer(request).await,
            IngestionRequest::Update(request) => self.ingest_update(request).await,
        }
    }

    /// Submit split tasks for a layer that has no tiles yet.
    #[instrument(
        skip(self, request),
        fields(product_id = %request.product.product_id, version = %request.product.product_version)
    )]
    pub async fn ingest_new_layer(&self, request: &NewLayerRequest) -> Result<SubmissionSummary> {
        let ranges = self.zoom_calculator.zoom_ranges(request.resolution)?;
        let job = self.job_meta(
            &request.product,
            &self.config.new_job_type,
            json!({
                "resolution": request.resolution,
                "originDirectory": request.origin_directory,
                "zoomRanges": ranges,
            }),
        );
        self.ensure_no_active_job(&job).await?;

        let layer = NewLayerSource {
            discrete_id: request.product.product_id.clone(),
            version: request.product.product_version.clone(),
            origin_directory: request.origin_directory.clone(),
            layer_relative_path: request.product.layer_relative_path(),
            footprint: request.footprint.clone(),
        };
        let tiler = SingleLayerTiler::new(self.config.max_tiles_per_bbox);
        info!(
            ranges = ranges.len(),
            zoom_bias = tiler.zoom_bias(),
            "Generating split tasks"
        );

        let summary = self
            .pipeline()?
            .submit(
                &job,
                &self.config.split_task_type,
                stream::iter(tiler.tasks(&layer, &ranges)),
            )
            .await?;
        Ok(self.report(summary))
    }

    /// Submit merge tasks for an update of an existing layer.
    #[instrument(
        skip(self, request),
        fields(product_id = %request.product.product_id, version = %request.product.product_version)
    )]
    pub async fn ingest_update(&self, request: &UpdateLayerRequest) -> Result<SubmissionSummary> {
        let max_zoom = zoom_for_resolution(request.resolution)?;
        let job = self.job_meta(
            &request.product,
            &self.config.update_job_type,
            json!({
                "resolution": request.resolution,
                "maxZoom": max_zoom,
                "layers": [&request.existing_layer.id, &request.update_layer.id],
            }),
        );
        self.ensure_no_active_job(&job).await?;

        // existing layer first: its tiles are the destination
        let layers = [request.existing_layer.clone(), request.update_layer.clone()];
        let generator = MergeBatchGenerator::new(
            &layers,
            request.existing_layer.tiles_path.as_str(),
            max_zoom,
            self.config.tile_batch_size,
            self.config.tiles_storage_provider.as_str(),
        )?
        .with_max_overlap_layers(self.config.max_overlap_layers);
        info!(max_zoom = max_zoom, "Generating merge tasks");

        let summary = self
            .pipeline()?
            .submit(
                &job,
                &self.config.merge_task_type,
                stream::iter(generator.batches()),
            )
            .await?;
        Ok(self.report(summary))
    }

    fn pipeline(&self) -> Result<TaskSubmissionPipeline<'_>> {
        TaskSubmissionPipeline::new(self.store.as_ref(), self.config.task_batch_size)
    }

    fn job_meta(
        &self,
        product: &ProductInfo,
        job_type: &str,
        parameters: serde_json::Value,
    ) -> NewJob {
        NewJob {
            resource_id: product.product_id.clone(),
            version: product.product_version.clone(),
            job_type: job_type.to_string(),
            product_type: product.product_type.clone(),
            product_name: product.display_name().to_string(),
            domain: self.config.job_domain.clone(),
            description: product.description.clone().unwrap_or_default(),
            parameters,
        }
    }

    /// Reject the request while another job of the same type still owns
    /// the resource version.
    async fn ensure_no_active_job(&self, job: &NewJob) -> Result<()> {
        let query = JobQuery {
            resource_id: job.resource_id.clone(),
            version: job.version.clone(),
            product_type: job.product_type.clone(),
            job_type: job.job_type.clone(),
        };
        let jobs = self.store.find_jobs(&query).await?;

        match jobs.into_iter().find(|existing| existing.status.is_active()) {
            Some(existing) => {
                warn!(
                    job_id = %existing.id,
                    status = ?existing.status,
                    "Conflicting job already running"
                );
                Err(IngestionError::ConflictingJob {
                    job_id: existing.id,
                    resource_id: query.resource_id,
                    version: query.version,
                    status: existing.status,
                })
            }
            None => Ok(()),
        }
    }

    fn report(&self, summary: SubmissionSummary) -> SubmissionSummary {
        match summary.job_id {
            Some(job_id) => info!(
                job_id = %job_id,
                tasks = summary.tasks_submitted,
                chunks = summary.chunks_submitted,
                "Ingestion tasks submitted"
            ),
            None => warn!("Request produced no tasks, no job created"),
        }
        summary
    }
}
