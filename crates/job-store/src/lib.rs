//! Job store abstractions for the raster tasker.
//!
//! Jobs track one ingestion request; tasks are the units of work appended to
//! a job in batches. The [`JobStore`] trait is the seam to the external job
//! tracking service, and [`InMemoryJobStore`] backs tests and local runs.

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::{JobStoreError, Result};
pub use memory::InMemoryJobStore;
pub use store::JobStore;
pub use types::{Job, JobId, JobQuery, JobStatus, NewJob, NewTask, Task};
