//! Retrieval-augmented answering over indexed PDF chunks.
//!
//! - `pipeline`: question -> embedding -> top-k chunks -> prompt -> answer
//! - `generator`: OpenAI-compatible chat completions client
//! - `ingest`: pages -> chunks -> embeddings -> vector index
pub mod generator;
pub mod ingest;
pub mod pipeline;

pub use generator::ChatCompletionsGenerator;
pub use ingest::{IngestStats, Ingestor};
pub use pipeline::{build_prompt, check_top_k, embed_query, RagPipeline, DEFAULT_TOP_K, FALLBACK_ANSWER};
