//! Offline evaluation of retrieval quality and end-to-end answer quality.
pub mod dataset;
pub mod end_to_end;
pub mod report;
pub mod retrieval;
pub mod runner;
pub mod scorer;

pub use dataset::load_eval_set;
pub use end_to_end::EndToEndEvaluator;
pub use report::write_reports;
pub use retrieval::{recall_at_k, semantic_match, RetrievalEvaluator, DEFAULT_SIMILARITY_THRESHOLD};
pub use runner::{run_all, EndToEndStatus, EvaluationRun};
pub use scorer::{CommandScorer, MetricSummary, MetricsReport, MetricsScorer, SampleMetrics};
