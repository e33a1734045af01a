//! Vector storage trait and the in-process implementation.

use crate::embeddings::cosine_similarity;
use crate::search::SearchQuery;
use crate::{Metadata, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A vector with its id and metadata, as written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, values: Vec<f32>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            values,
            metadata,
        }
    }
}

/// A record returned by fetch or query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,

    /// Similarity score. Fetch results carry `1.0`.
    pub score: f32,

    #[serde(default)]
    pub metadata: Metadata,
}

/// Aggregate counts reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Vectors in this application's namespace.
    pub total_memories: u64,

    /// Vectors across the whole index.
    pub total_vectors: u64,

    pub dimension: Option<usize>,

    pub index_fullness: Option<f64>,
}

/// Trait for vector stores.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite a vector.
    async fn upsert(&self, record: VectorRecord) -> Result<()>;

    /// Fetch records by id. Missing ids are skipped; the rest keep the
    /// order of `ids`.
    async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorMatch>>;

    /// Nearest neighbours of the query vector, best first.
    async fn query(&self, query: &SearchQuery) -> Result<Vec<VectorMatch>>;

    /// Delete a vector by id. Deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Aggregate statistics.
    async fn stats(&self) -> Result<StoreStats>;

    /// Short human-readable description, e.g. for logs.
    fn describe(&self) -> String;
}

/// In-memory vector store for offline use and tests.
pub struct InMemoryVectorStore {
    entries: RwLock<HashMap<String, VectorRecord>>,
    dimension: usize,
}

impl InMemoryVectorStore {
    /// Create an empty store for vectors of `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dimension,
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(record.id.clone(), record);
        Ok(())
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorMatch>> {
        let entries = self.entries.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| entries.get(id))
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: 1.0,
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    async fn query(&self, query: &SearchQuery) -> Result<Vec<VectorMatch>> {
        let entries = self.entries.read().await;

        let mut results: Vec<VectorMatch> = entries
            .values()
            .filter(|record| {
                query
                    .filter
                    .as_ref()
                    .map_or(true, |f| f.matches(&record.metadata))
            })
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: cosine_similarity(&query.vector, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();

        // Sort by score descending, then id for a stable order
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(query.top_k);

        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(id);
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let count = self.entries.read().await.len() as u64;
        Ok(StoreStats {
            total_memories: count,
            total_vectors: count,
            dimension: Some(self.dimension),
            index_fullness: None,
        })
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MetadataFilter;
    use crate::Category;
    use serde_json::json;

    fn meta(category: &str) -> Metadata {
        json!({ "category": category }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_upsert_and_fetch_keeps_order() {
        let store = InMemoryVectorStore::new(2);
        store
            .upsert(VectorRecord::new("a", vec![1.0, 0.0], meta("work")))
            .await
            .unwrap();
        store
            .upsert(VectorRecord::new("b", vec![0.0, 1.0], meta("idea")))
            .await
            .unwrap();

        let ids = vec!["b".to_string(), "missing".to_string(), "a".to_string()];
        let fetched = store.fetch(&ids).await.unwrap();
        let got: Vec<&str> = fetched.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(got, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_in_memory_query_ranks_and_filters() {
        let store = InMemoryVectorStore::new(2);
        store
            .upsert(VectorRecord::new("near", vec![1.0, 0.1], meta("work")))
            .await
            .unwrap();
        store
            .upsert(VectorRecord::new("far", vec![0.0, 1.0], meta("work")))
            .await
            .unwrap();
        store
            .upsert(VectorRecord::new("other", vec![1.0, 0.0], meta("idea")))
            .await
            .unwrap();

        let results = store
            .query(&SearchQuery::new(vec![1.0, 0.0]).with_top_k(2))
            .await
            .unwrap();
        assert_eq!(results[0].id, "other");
        assert_eq!(results[1].id, "near");

        let filtered = store
            .query(
                &SearchQuery::new(vec![1.0, 0.0])
                    .with_filter(MetadataFilter::category(Category::Work)),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = filtered.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
    }

    #[tokio::test]
    async fn test_in_memory_delete_and_stats() {
        let store = InMemoryVectorStore::new(2);
        store
            .upsert(VectorRecord::new("a", vec![1.0, 0.0], Metadata::new()))
            .await
            .unwrap();
        store.delete("a").await.unwrap();
        store.delete("never-existed").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_memories, 0);
        assert_eq!(stats.dimension, Some(2));
    }
}
