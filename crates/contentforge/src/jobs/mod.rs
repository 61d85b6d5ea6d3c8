//! Processing jobs: creation, execution, retry and result lookup.

pub mod combined;
pub mod manager;

pub use combined::CombinedContent;
pub use manager::{JobManager, JobOptions, JobQuery};
