//! Similarity query types and query-context extraction.

use crate::{Category, Metadata};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Equality filter on a single metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub field: String,
    pub value: Value,
}

impl MetadataFilter {
    /// Filter on the `category` metadata field.
    pub fn category(category: Category) -> Self {
        Self {
            field: "category".to_string(),
            value: Value::String(category.as_str().to_string()),
        }
    }

    /// Pinecone filter expression, e.g. `{"category": {"$eq": "work"}}`.
    pub fn to_pinecone(&self) -> Value {
        let mut expr = serde_json::Map::new();
        expr.insert(self.field.clone(), json!({ "$eq": self.value }));
        Value::Object(expr)
    }

    /// Whether `metadata` satisfies the filter.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata.get(&self.field) == Some(&self.value)
    }
}

/// Similarity query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query vector.
    pub vector: Vec<f32>,

    /// Maximum results to return.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Optional metadata filter.
    #[serde(default)]
    pub filter: Option<MetadataFilter>,
}

fn default_top_k() -> usize {
    5
}

impl SearchQuery {
    /// Create a new query for `vector`.
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            top_k: default_top_k(),
            filter: None,
        }
    }

    /// Set the result limit.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the metadata filter.
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Hints pulled out of a free-text recall query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryContext {
    pub original_query: String,

    /// Category named as a whole word in the query.
    pub category: Option<Category>,

    /// Time period phrase such as "last week". Informational only.
    pub time_period: Option<&'static str>,

    /// Double-quoted phrases.
    pub exact_phrases: Vec<String>,
}

impl QueryContext {
    /// Filter to apply to the similarity query, if any.
    pub fn filter(&self) -> Option<MetadataFilter> {
        self.category.map(MetadataFilter::category)
    }

    /// Whether `text` contains every quoted phrase, ignoring case.
    pub fn matches_phrases(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.exact_phrases
            .iter()
            .all(|p| lower.contains(&p.to_lowercase()))
    }
}

static TIME_PERIODS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ["today", "yesterday", "this week", "last week", "this month"]
        .into_iter()
        .map(|period| {
            let pattern = format!(r"(?i)\b{}\b", period.replace(' ', r"\s+"));
            (period, Regex::new(&pattern).expect("invalid regex"))
        })
        .collect()
});

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).expect("invalid regex"));

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]+\b").expect("invalid regex"));

/// Extract category, time period and quoted phrases from a recall query.
///
/// A category only counts when it appears as a whole word, so "networking"
/// does not select "work". `general` is never inferred.
pub fn extract_query_context(query: &str) -> QueryContext {
    let lower = query.to_lowercase();

    let time_period = TIME_PERIODS
        .iter()
        .find(|(_, re)| re.is_match(query))
        .map(|(period, _)| *period);

    let category = WORD
        .find_iter(&lower)
        .filter_map(|m| m.as_str().parse::<Category>().ok())
        .find(|c| *c != Category::General);

    let exact_phrases = QUOTED
        .captures_iter(query)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    QueryContext {
        original_query: query.to_string(),
        category,
        time_period,
        exact_phrases,
    }
}
