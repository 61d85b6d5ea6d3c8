//! Bundles of content items, their numbered attempts and the processing
//! flow that ties an attempt to a job.

pub mod diff;
pub mod manager;
pub mod processing;

pub use diff::{AttemptChanges, AttemptDiff, AttemptSummary};
pub use manager::{BundleDetails, BundleManager};
pub use processing::{BundleProcessor, ProcessBundleRequest, ProcessOutcome};
