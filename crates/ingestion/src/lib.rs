//! Raster layer ingestion library.
//!
//! Turns ingestion requests into jobs and tasks:
//!
//! - [`Ingester`] plans new-layer and update requests with the `tiling`
//!   engine and checks for conflicting jobs
//! - [`TaskSubmissionPipeline`] streams the resulting work items into the
//!   job store in bounded chunks and fails the job if submission breaks off
//! - [`TaskerConfig`] holds the tunables shared by both

pub mod config;
pub mod error;
mod ingester;
pub mod request;
pub mod submission;

// Re-exports
pub use config::TaskerConfig;
pub use error::{IngestionError, Result};
pub use ingester::Ingester;
pub use request::{IngestionRequest, NewLayerRequest, ProductInfo, UpdateLayerRequest};
pub use submission::{SubmissionSummary, TaskSubmissionPipeline};
