//! Chunked task submission against a scripted job store.

use futures::stream;
use ingestion::{IngestionError, TaskSubmissionPipeline};
use job_store::{JobStatus, JobStoreError, NewJob};
use serde_json::json;
use test_utils::{
    nan_vertex_geometry, rect_layer, three_overlapping_layers, ScriptedJobStore, StoreCall,
};
use tiling::{LayerFootprint, OverlapDecomposer, TilingError};
use tokio_test::assert_err;

fn job() -> NewJob {
    NewJob {
        resource_id: "tlv".to_string(),
        version: "1.0".to_string(),
        job_type: "Ingestion_Update".to_string(),
        product_type: "Orthophoto".to_string(),
        product_name: "tlv".to_string(),
        domain: "RASTER".to_string(),
        description: String::new(),
        parameters: json!({}),
    }
}

fn items(n: u32) -> impl futures::Stream<Item = Result<u32, TilingError>> {
    stream::iter((0..n).map(Ok))
}

fn is_create(call: &StoreCall) -> bool {
    matches!(call, StoreCall::CreateJob { .. })
}

fn is_add(call: &StoreCall) -> bool {
    matches!(call, StoreCall::AddTasks { .. })
}

fn is_failed_status(call: &StoreCall) -> bool {
    matches!(
        call,
        StoreCall::SetStatus {
            status: JobStatus::Failed,
            ..
        }
    )
}

#[tokio::test]
async fn test_batch_size_one_creates_then_appends() {
    let store = ScriptedJobStore::new();
    let pipeline = TaskSubmissionPipeline::new(&store, 1).unwrap();

    let summary = pipeline.submit(&job(), "tilesMerging", items(4)).await.unwrap();

    assert_eq!(store.count(is_create), 1);
    assert_eq!(store.count(is_add), 3);
    assert!(matches!(store.calls()[0], StoreCall::CreateJob { tasks: 1 }));
    assert_eq!(summary.tasks_submitted, 4);
    assert_eq!(summary.chunks_submitted, 4);

    let stored = store.get_job(&summary.job_id.unwrap()).await.unwrap();
    let order: Vec<_> = stored.tasks.iter().map(|t| t.parameters.clone()).collect();
    assert_eq!(order, vec![json!(0), json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn test_large_batch_creates_single_job() {
    let store = ScriptedJobStore::new();
    let pipeline = TaskSubmissionPipeline::new(&store, 10).unwrap();

    let summary = pipeline.submit(&job(), "tilesMerging", items(10)).await.unwrap();

    assert_eq!(store.calls(), vec![StoreCall::CreateJob { tasks: 10 }]);
    assert_eq!(summary.chunks_submitted, 1);
}

#[tokio::test]
async fn test_partial_last_chunk_is_flushed() {
    let store = ScriptedJobStore::new();
    let pipeline = TaskSubmissionPipeline::new(&store, 3).unwrap();

    let summary = pipeline.submit(&job(), "tilesMerging", items(7)).await.unwrap();
    let job_id = summary.job_id.unwrap();

    assert_eq!(
        store.calls(),
        vec![
            StoreCall::CreateJob { tasks: 3 },
            StoreCall::AddTasks { job_id, tasks: 3 },
            StoreCall::AddTasks { job_id, tasks: 1 },
        ]
    );
}

#[tokio::test]
async fn test_no_items_no_job() {
    let store = ScriptedJobStore::new();
    let pipeline = TaskSubmissionPipeline::new(&store, 5).unwrap();

    let summary = pipeline.submit(&job(), "tilesMerging", items(0)).await.unwrap();

    assert_eq!(summary.job_id, None);
    assert_eq!(summary.tasks_submitted, 0);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_add_tasks_failure_fails_job_once() {
    let store = ScriptedJobStore::new().fail_add_tasks_on(2);
    let pipeline = TaskSubmissionPipeline::new(&store, 2).unwrap();

    let result = pipeline.submit(&job(), "tilesMerging", items(10)).await;

    assert!(matches!(
        result,
        Err(IngestionError::JobStore(JobStoreError::Backend(ref msg))) if msg == "add_tasks rejected"
    ));
    assert_eq!(store.count(is_failed_status), 1);
    // nothing is submitted after the failure
    assert_eq!(store.count(is_add), 2);
    assert!(is_failed_status(store.calls().last().unwrap()));

    let job_id = store
        .calls()
        .iter()
        .find_map(|call| match call {
            StoreCall::SetStatus { job_id, .. } => Some(*job_id),
            _ => None,
        })
        .unwrap();
    let stored = store.get_job(&job_id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(
        stored.reason.as_deref(),
        Some("Job store request failed: Job store backend error: add_tasks rejected")
    );
}

#[tokio::test]
async fn test_create_failure_is_returned_directly() {
    let store = ScriptedJobStore::new().fail_create();
    let pipeline = TaskSubmissionPipeline::new(&store, 2).unwrap();

    assert_err!(pipeline.submit(&job(), "tilesMerging", items(5)).await);
    assert_eq!(store.calls(), vec![StoreCall::CreateJob { tasks: 2 }]);
}

#[tokio::test]
async fn test_tiling_error_mid_stream_fails_job() {
    let store = ScriptedJobStore::new();
    let pipeline = TaskSubmissionPipeline::new(&store, 2).unwrap();
    let stream = stream::iter(vec![
        Ok(1u32),
        Ok(2),
        Ok(3),
        Err(TilingError::InvalidBatchSize),
        Ok(4),
    ]);

    let result = pipeline.submit(&job(), "tilesMerging", stream).await;

    assert!(matches!(
        result,
        Err(IngestionError::Tiling(TilingError::InvalidBatchSize))
    ));
    assert_eq!(store.count(is_create), 1);
    assert_eq!(store.count(is_add), 0);
    assert_eq!(store.count(is_failed_status), 1);
}

/// Layer ids of each region, as submitted task parameters.
fn region_ids(
    decomposer: OverlapDecomposer<'_>,
) -> impl Iterator<Item = Result<Vec<String>, TilingError>> + '_ {
    decomposer.map(|region| region.map(|r| r.layer_ids().into_iter().map(str::to_string).collect()))
}

#[tokio::test]
async fn test_geometry_error_after_job_created_fails_job() {
    let good = three_overlapping_layers();
    let good_footprints = good
        .iter()
        .map(|l| LayerFootprint::new(l, l.footprint.as_multi_polygon().clone()))
        .collect();
    let a = rect_layer("a", (0.0, 0.0, 2.0, 2.0));
    let b = rect_layer("b", (1.0, 0.0, 3.0, 2.0));
    let broken_footprints = vec![
        LayerFootprint::new(&a, a.footprint.as_multi_polygon().clone()),
        LayerFootprint::new(&b, nan_vertex_geometry()),
    ];
    let regions = region_ids(OverlapDecomposer::new(good_footprints, 16).unwrap())
        .chain(region_ids(OverlapDecomposer::new(broken_footprints, 16).unwrap()));

    let store = ScriptedJobStore::new();
    let pipeline = TaskSubmissionPipeline::new(&store, 1).unwrap();
    let result = pipeline
        .submit(&job(), "tilesMerging", stream::iter(regions))
        .await;

    match result {
        Err(IngestionError::Tiling(TilingError::Geometry { layers, .. })) => {
            assert_eq!(layers, vec!["a", "b"]);
        }
        other => panic!("expected a geometry error, got {:?}", other),
    }
    // seven regions of the healthy decomposition were submitted first
    assert_eq!(store.count(is_create), 1);
    assert_eq!(store.count(is_add), 6);
    assert_eq!(store.count(is_failed_status), 1);

    let reason = store.calls().into_iter().find_map(|call| match call {
        StoreCall::SetStatus { reason, .. } => reason,
        _ => None,
    });
    assert!(reason.unwrap().starts_with("Geometry operation failed for layers"));
}

#[tokio::test]
async fn test_tiling_error_before_job_touches_nothing() {
    let store = ScriptedJobStore::new();
    let pipeline = TaskSubmissionPipeline::new(&store, 2).unwrap();
    let stream = stream::iter(vec![Ok(1u32), Err(TilingError::InvalidBatchSize)]);

    assert_err!(pipeline.submit(&job(), "tilesMerging", stream).await);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_status_update_failure_replaces_error() {
    let store = ScriptedJobStore::new().fail_add_tasks_on(1).fail_set_status();
    let pipeline = TaskSubmissionPipeline::new(&store, 1).unwrap();

    let result = pipeline.submit(&job(), "tilesMerging", items(3)).await;

    assert!(matches!(
        result,
        Err(IngestionError::JobStore(JobStoreError::Backend(ref msg))) if msg == "set_job_status rejected"
    ));
    assert_eq!(store.count(is_failed_status), 1);
}
