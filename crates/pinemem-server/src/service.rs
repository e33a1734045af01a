//! The memory service: store, list and recall.
//!
//! Constructed once at startup and shared behind an `Arc`. Every operation
//! returns a typed result; turning failures into user text is left to the
//! tool layer.

use crate::error::ServerError;
use chrono::Local;
use pinemem_core::{id, Config};
use pinemem_memory::search::extract_query_context;
use pinemem_memory::text::{categorize, extract_keywords};
use pinemem_memory::{
    Category, EmbeddingGateway, InMemoryVectorStore, IndexedMemory, LocalIndex, LocalIndexStats,
    MemoryError, Metadata, PineconeStore, QueryContext, SearchQuery, StoreStats, VectorMatch,
    VectorRecord, VectorStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from memory service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A caller-supplied argument was missing or invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// The vector store call failed.
    #[error("{0}")]
    Store(#[from] MemoryError),

    /// The local index could not be updated.
    #[error("{0}")]
    Index(String),
}

/// Outcome of a successful store.
#[derive(Debug, Clone)]
pub struct StoredMemory {
    pub id: String,
    pub category: Category,
    pub keywords: Vec<String>,
    pub timestamp: String,
}

/// Outcome of a list.
#[derive(Debug, Clone)]
pub struct MemoryListing {
    pub category: Option<Category>,

    /// Ids in the local index before filtering.
    pub total: usize,

    /// Records fetched from the vector store, in index order.
    pub memories: Vec<VectorMatch>,

    pub stats: LocalIndexStats,
}

/// Outcome of a recall.
#[derive(Debug, Clone)]
pub struct RecallResult {
    pub query: String,
    pub context: QueryContext,

    /// Matches, best first.
    pub matches: Vec<VectorMatch>,
}

/// Local and remote statistics.
#[derive(Debug, Clone)]
pub struct ServiceStats {
    pub local: LocalIndexStats,
    pub store: Result<StoreStats, String>,
    pub backend: String,
}

/// Text of a stored memory, from its vector metadata.
pub fn memory_text(metadata: &Metadata) -> &str {
    metadata
        .get("memory_text")
        .and_then(Value::as_str)
        .unwrap_or("No text available")
}

/// The memory service.
pub struct MemoryService {
    embeddings: EmbeddingGateway,
    store: Arc<dyn VectorStore>,
    index: Arc<LocalIndex>,
    default_list_limit: usize,
    default_top_k: usize,
}

impl MemoryService {
    /// Create a service from its collaborators.
    pub fn new(
        embeddings: EmbeddingGateway,
        store: Arc<dyn VectorStore>,
        index: Arc<LocalIndex>,
    ) -> Self {
        Self {
            embeddings,
            store,
            index,
            default_list_limit: 10,
            default_top_k: 5,
        }
    }

    /// Override the defaults used when callers omit `limit` or `top_k`.
    pub fn with_defaults(mut self, list_limit: usize, top_k: usize) -> Self {
        self.default_list_limit = list_limit;
        self.default_top_k = top_k;
        self
    }

    /// Connect to Pinecone and the embedding API described by `config`.
    ///
    /// Fails when the config is invalid, `PINECONE_API_KEY` is missing or
    /// the index cannot be reached.
    pub async fn connect(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;
        config.pinecone_api_key()?;
        let embeddings =
            EmbeddingGateway::from_config(&config.embeddings, config.pinecone.dimension)?;
        let store = PineconeStore::connect(&config.pinecone).await?;
        let index = LocalIndex::new(config.index_path()?);

        Ok(Self::new(embeddings, Arc::new(store), Arc::new(index))
            .with_defaults(config.server.default_list_limit, config.server.default_top_k))
    }

    /// Service backed by an in-process vector store and pseudo embeddings.
    /// Needs no credentials; vectors are lost on exit.
    pub fn offline(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;
        let dimension = config.pinecone.dimension;
        let embeddings = EmbeddingGateway::offline(config.embeddings.fallback, dimension);
        let store = InMemoryVectorStore::new(dimension);
        let index = LocalIndex::new(config.index_path()?);

        Ok(Self::new(embeddings, Arc::new(store), Arc::new(index))
            .with_defaults(config.server.default_list_limit, config.server.default_top_k))
    }

    pub fn default_list_limit(&self) -> usize {
        self.default_list_limit
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// The local index.
    pub fn index(&self) -> &LocalIndex {
        &self.index
    }

    /// Description of the vector store backend.
    pub fn backend(&self) -> String {
        self.store.describe()
    }

    /// Store a memory: embed, upsert, then record it locally.
    pub async fn remember(
        &self,
        memory: &str,
        context: Option<&str>,
    ) -> Result<StoredMemory, ServiceError> {
        if memory.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "'memory' must not be empty".to_string(),
            ));
        }
        let context = context.map(str::trim).filter(|c| !c.is_empty());

        let full_text = match context {
            Some(ctx) => format!("{}\n\nContext: {}", memory, ctx),
            None => memory.to_string(),
        };

        let now = Local::now();
        let id = id::memory_id_at(memory, now);
        let keywords = extract_keywords(&full_text);
        let category = categorize(&full_text);
        let timestamp = now.to_rfc3339();

        let vector = self.embeddings.embed(&full_text).await;

        let metadata = json!({
            "memory_text": memory,
            "context": context.unwrap_or(""),
            "timestamp": timestamp,
            "category": category.as_str(),
            "keywords": keywords.join(", "),
            "char_count": memory.chars().count(),
        });
        let metadata = match metadata {
            Value::Object(map) => map,
            _ => Metadata::new(),
        };

        self.store
            .upsert(VectorRecord::new(id.clone(), vector, metadata))
            .await?;

        if !self
            .index
            .add(&id, memory, category, keywords.clone())
            .await
        {
            return Err(ServiceError::Index(format!(
                "memory {} was stored in the vector store but could not be recorded in {}",
                id,
                self.index.path().display()
            )));
        }

        info!("Stored memory {} (category: {})", id, category);
        Ok(StoredMemory {
            id,
            category,
            keywords,
            timestamp,
        })
    }

    /// List up to `limit` memories, optionally restricted to one category.
    pub async fn list(
        &self,
        category: Option<Category>,
        limit: usize,
    ) -> Result<MemoryListing, ServiceError> {
        if limit == 0 {
            return Err(ServiceError::InvalidArgument(
                "'limit' must be at least 1".to_string(),
            ));
        }

        let all_ids = self.index.list_ids().await;
        let ids: Vec<String> = match category {
            Some(category) => self
                .index
                .find_by_category(category)
                .await
                .into_iter()
                .map(|m| m.id)
                .take(limit)
                .collect(),
            None => all_ids.iter().take(limit).cloned().collect(),
        };

        let memories = if ids.is_empty() {
            Vec::new()
        } else {
            self.store.fetch(&ids).await?
        };
        if memories.len() < ids.len() {
            debug!(
                "{} of {} listed ids were not returned by the vector store",
                ids.len() - memories.len(),
                ids.len()
            );
        }

        Ok(MemoryListing {
            category,
            total: all_ids.len(),
            memories,
            stats: self.index.stats().await,
        })
    }

    /// Find the `top_k` memories most similar to `query`.
    ///
    /// A category named in the query becomes a metadata filter; quoted
    /// phrases must appear in the recalled text.
    pub async fn recall(&self, query: &str, top_k: usize) -> Result<RecallResult, ServiceError> {
        if query.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "'query' must not be empty".to_string(),
            ));
        }
        if top_k == 0 {
            return Err(ServiceError::InvalidArgument(
                "'top_k' must be at least 1".to_string(),
            ));
        }

        let context = extract_query_context(query);
        let vector = self.embeddings.embed(query).await;

        let mut search = SearchQuery::new(vector).with_top_k(top_k);
        if let Some(filter) = context.filter() {
            debug!("Recall filtered by {} = {}", filter.field, filter.value);
            search = search.with_filter(filter);
        }

        let mut matches = self.store.query(&search).await?;
        if !context.exact_phrases.is_empty() {
            matches.retain(|m| context.matches_phrases(memory_text(&m.metadata)));
        }

        Ok(RecallResult {
            query: query.to_string(),
            context,
            matches,
        })
    }

    /// Delete a memory from the vector store, then from the local index.
    /// Returns whether the id was known locally.
    pub async fn forget(&self, id: &str) -> Result<bool, ServiceError> {
        self.store.delete(id).await?;
        let removed = self.index.remove(id).await;
        if removed {
            info!("Forgot memory {}", id);
        } else {
            warn!("Memory {} was not in the local index", id);
        }
        Ok(removed)
    }

    /// Keyword search over the local index only.
    pub async fn search_local(&self, term: &str) -> Vec<IndexedMemory> {
        self.index.find_by_keyword(term).await
    }

    /// Local index stats, plus vector store stats when reachable.
    pub async fn stats(&self) -> ServiceStats {
        let store = self.store.stats().await.map_err(|e| e.to_string());
        ServiceStats {
            local: self.index.stats().await,
            store,
            backend: self.store.describe(),
        }
    }
}
