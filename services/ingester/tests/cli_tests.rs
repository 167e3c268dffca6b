//! Request loading and end-to-end runs of the planner.

use std::io::Write;
use std::sync::Arc;

use ingester::{load_config, read_request, run};
use job_store::{InMemoryJobStore, JobStatus};
use tempfile::NamedTempFile;

const NEW_LAYER_REQUEST: &str = r#"{
    "kind": "new",
    "productId": "tlv",
    "productVersion": "1.0",
    "productType": "Orthophoto",
    "productName": "Tel Aviv",
    "resolution": 0.17578125,
    "originDirectory": "incoming/tlv",
    "footprint": {
        "type": "Polygon",
        "coordinates": [[[34.75, 32.0], [34.85, 32.0], [34.85, 32.1], [34.75, 32.1], [34.75, 32.0]]]
    }
}"#;

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn test_read_request() {
    let file = temp_file(NEW_LAYER_REQUEST);
    let request = read_request(file.path()).unwrap();
    assert_eq!(request.product().product_id, "tlv");
    assert_eq!(request.product().display_name(), "Tel Aviv");
}

#[test]
fn test_read_request_errors_name_the_file() {
    let file = temp_file("{\"kind\": \"sideways\"}");
    let error = read_request(file.path()).unwrap_err();
    assert!(error.to_string().contains("Invalid ingestion request"));

    assert!(read_request(std::path::Path::new("/nonexistent/request.json")).is_err());
}

#[test]
fn test_load_config_from_file() {
    let file = temp_file("zoom_groups: \"0-1,2\"\nmax_tiles_per_bbox: 1\n");
    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.zoom_groups, "0-1,2");
    assert_eq!(config.max_tiles_per_bbox, 1);
}

#[test]
fn test_load_config_rejects_invalid_file() {
    let file = temp_file("task_batch_size: 0\n");
    assert!(load_config(Some(file.path())).is_err());
}

#[tokio::test]
async fn test_run_new_layer_request() {
    let config_file = temp_file("zoom_groups: \"0-1,2\"\nmax_tiles_per_bbox: 1\n");
    let request_file = temp_file(NEW_LAYER_REQUEST);

    let config = load_config(Some(config_file.path())).unwrap();
    let request = read_request(request_file.path()).unwrap();
    let store = Arc::new(InMemoryJobStore::new());

    let report = run(config, &request, store.clone()).await.unwrap();

    assert!(report.job_id.is_some());
    assert_eq!(report.task_count, 2);
    assert_eq!(report.status, Some(JobStatus::InProgress));
    assert_eq!(report.job_type.as_deref(), Some("Ingestion_New"));
    assert_eq!(store.job_count().await, 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["taskCount"], 2);
    assert_eq!(json["resourceId"], "tlv");
}
