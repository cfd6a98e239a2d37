//! Chunk storage and k-nearest-neighbour retrieval.
//!
//! `LanceIndex` persists chunks, their page/source metadata and embeddings in
//! a LanceDB table keyed by chunk id; `MemoryIndex` offers the same contract
//! without persistence.
pub mod lance;
pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use lance::LanceIndex;
pub use memory::MemoryIndex;
