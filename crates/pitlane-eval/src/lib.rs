//! C5–C7 — the assertion engine, metrics collector, and aggregator.

pub mod aggregate;
pub mod assertion;
pub mod metrics;
pub mod similarity;

pub use aggregate::aggregate_results;
pub use assertion::evaluate_assertion;
pub use metrics::{build_iteration_result, compute_metrics, FilesystemSnapshot};
pub use similarity::SimilarityBinaries;
