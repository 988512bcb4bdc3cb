//! Storage module for embedding similarity search

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{Metric, SimilarityResult, SimilarityStore};
