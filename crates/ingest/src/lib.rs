//! Scrape-to-store ingestion.
//!
//! [`source::ListingSource`] is the seam scrapers implement;
//! [`pipeline::IngestPipeline`] drives matching, classification, and
//! snapshot capture for every stale catalog item.

pub mod pipeline;
pub mod snapshot;
pub mod source;

pub use pipeline::{CancelFlag, IngestPipeline, IngestReport};
pub use snapshot::SnapshotBuilder;
pub use source::{ListingPage, ListingSource};
