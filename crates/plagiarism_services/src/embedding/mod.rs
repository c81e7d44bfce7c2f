//! Embedder implementations that need no network access

mod hash_embedder;

pub use hash_embedder::HashEmbedder;
