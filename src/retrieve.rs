//! Filtered vector retrieval against the remote index.

use tracing::debug;

use crate::embedding::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::SearchHit;

/// Embed the query text and run a user-scoped vector search.
///
/// The filter is an exact match on `userId`, not a vector comparison, so a
/// query never surfaces another user's records. Results keep the service's
/// descending-score order; no client-side re-ranking. An empty result set
/// is a valid outcome, not an error.
pub async fn retrieve_context(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    query: &str,
    user_id: &str,
    top_k: usize,
) -> Result<Vec<SearchHit>> {
    let query_vector = embedder.embed(query).await?;
    let hits = index.vector_search(&query_vector, top_k, Some(user_id)).await?;
    debug!(user = %user_id, hits = hits.len(), "vector search complete");
    Ok(hits)
}
