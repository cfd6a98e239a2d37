#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod pages;
pub mod traits;
pub mod types;
pub mod vector_math;

pub use chunker::{chunk_pages, CharWindowChunker, Chunker, ChunkStrategy, ChunkingConfig, SentenceWindowChunker};
pub use error::{Error, Result};
pub use traits::{Embedder, Generator, VectorIndex};
pub use types::*;
