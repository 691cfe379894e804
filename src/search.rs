//! Semantic retrieval for the question-answering path.

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::ScoredChunk;

/// Embed the query and return the top-k most similar chunks, best match
/// first. An empty query returns no results without touching the provider.
pub async fn search_chunks(
    index: &VectorIndex,
    provider: &dyn EmbeddingProvider,
    query: &str,
    top_k: usize,
) -> Result<Vec<ScoredChunk>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = embed_query(provider, query).await?;
    index.search(&query_vec, top_k).await
}
