// University knowledge base: profile store, embeddings and hybrid search.
// Structured filters run in SQL, ranking runs in memory over the filtered set.

pub mod embedding;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod search;
pub mod text;
