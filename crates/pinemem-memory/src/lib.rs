//! Memory storage for pinemem.
//!
//! This crate provides:
//! - The local side-index of stored memory ids ([`LocalIndex`])
//! - Keyword, category and display heuristics ([`text`])
//! - Embedding generation with an offline fallback ([`EmbeddingGateway`])
//! - Vector storage over Pinecone or in process ([`VectorStore`])

pub mod embeddings;
pub mod error;
pub mod index;
pub mod pinecone;
pub mod search;
pub mod store;
pub mod text;
mod timestamp;

pub use embeddings::{EmbeddingGateway, EmbeddingProvider, HashEmbeddings, OpenAIEmbeddings};
pub use error::MemoryError;
pub use index::{IndexFile, LocalIndex, LocalIndexStats};
pub use pinecone::PineconeStore;
pub use search::{MetadataFilter, QueryContext, SearchQuery};
pub use store::{InMemoryVectorStore, StoreStats, VectorMatch, VectorRecord, VectorStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result type for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Metadata stored next to each vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Number of characters of memory text kept in the local index.
pub const EXCERPT_CHARS: usize = 500;

/// Memory category. A closed set assigned once at creation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technical,
    Work,
    Personal,
    Learning,
    Idea,
    Reminder,
    Reference,
    General,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 8] = [
        Category::Technical,
        Category::Work,
        Category::Personal,
        Category::Learning,
        Category::Idea,
        Category::Reminder,
        Category::Reference,
        Category::General,
    ];

    /// Lowercase name, as stored and displayed.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Learning => "learning",
            Self::Idea => "idea",
            Self::Reminder => "reminder",
            Self::Reference => "reference",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected one of: technical, work, personal, learning, idea, reminder, reference, general)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A memory as recorded in the local side-index.
///
/// Only an excerpt of the text is kept locally; the full text and the
/// vector live in the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// First [`EXCERPT_CHARS`] characters of the memory text.
    #[serde(rename = "text")]
    pub text_excerpt: String,

    pub category: Category,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a record stamped with the current time.
    pub fn new(text: &str, category: Category, keywords: Vec<String>) -> Self {
        Self {
            text_excerpt: excerpt(text),
            category,
            keywords,
            created_at: Utc::now(),
        }
    }
}

/// A record returned from a scan, with its id attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedMemory {
    pub id: String,
    #[serde(flatten)]
    pub record: MemoryRecord,
}

/// First [`EXCERPT_CHARS`] characters of `text`.
pub fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}
