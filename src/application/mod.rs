//! Application layer - use cases and orchestration.
//!
//! This layer contains the path resolution, export orchestration, and the
//! takeout driver that sequences the whole run.

pub mod exporter;
pub mod paths;
pub mod takeout;

pub use exporter::{CollectionExporter, ExportApi, ExportTarget, PollOptions};
pub use paths::{sanitize, PathResolver};
pub use takeout::{run_takeout, TakeoutOptions};
