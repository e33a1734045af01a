//! Text heuristics: keyword extraction, categorization and display.
//!
//! Everything here is a pure function over strings.

use crate::{Category, Metadata};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Maximum number of keywords attached to a memory.
pub const MAX_KEYWORDS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "up", "about", "into", "through", "during", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "do", "does", "did", "will", "would", "should",
    "could", "may", "might", "must", "can", "this", "that", "these", "those", "i", "you",
    "he", "she", "it", "we", "they", "what", "which", "who", "when", "where", "why", "how",
];

/// Scored categories and their trigger phrases, in tie-break order.
const CATEGORY_TRIGGERS: &[(Category, &[&str])] = &[
    (
        Category::Technical,
        &[
            "code", "programming", "software", "api", "database", "algorithm", "function",
            "debug", "error", "bug", "server", "deploy",
        ],
    ),
    (
        Category::Work,
        &[
            "meeting", "project", "deadline", "task", "client", "presentation", "report",
            "team", "manager", "office", "colleague",
        ],
    ),
    (
        Category::Personal,
        &[
            "family", "friend", "birthday", "vacation", "hobby", "home", "weekend", "holiday",
            "personal", "myself",
        ],
    ),
    (
        Category::Learning,
        &[
            "learn", "study", "course", "tutorial", "book", "article", "research",
            "understand", "knowledge", "skill",
        ],
    ),
    (
        Category::Idea,
        &[
            "idea", "concept", "thought", "brainstorm", "innovation", "creative", "imagine",
            "possibility", "what if", "consider",
        ],
    ),
    (
        Category::Reminder,
        &[
            "remember", "remind", "don't forget", "note to self", "important", "todo", "must",
            "need to", "should",
        ],
    ),
    (
        Category::Reference,
        &[
            "link", "url", "website", "resource", "documentation", "guide", "manual",
            "reference", "source", "information",
        ],
    ),
];

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z0-9]+\b").expect("invalid regex"));
static STOP_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

/// Extract up to [`MAX_KEYWORDS`] keywords from `text`.
///
/// Tokens are lowercase alphanumeric runs longer than two characters that
/// are not stop words, ranked by frequency. Equal counts keep first-seen
/// order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for token in TOKEN.find_iter(&lower).map(|m| m.as_str()) {
        if token.len() <= 2 || STOP_SET.contains(token) {
            continue;
        }
        match position.get(token) {
            Some(&i) => counts[i].1 += 1,
            None => {
                position.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    // stable: ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, _)| word.to_string())
        .collect()
}

/// Assign a category by counting trigger phrases that occur in `text`.
pub fn categorize(text: &str) -> Category {
    let lower = text.to_lowercase();
    let mut best = (Category::General, 0usize);

    for (category, triggers) in CATEGORY_TRIGGERS {
        let score = triggers.iter().filter(|t| lower.contains(*t)).count();
        if score > best.1 {
            best = (*category, score);
        }
    }
    best.0
}

/// Shorten `text` to at most `max_chars` characters, cutting at the last
/// space and appending `...`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    let kept = match cut.rfind(' ') {
        Some(i) if i > 0 => &cut[..i],
        _ => cut.as_str(),
    };
    format!("{}...", kept)
}

/// Render one memory as a human-readable block.
///
/// `score` is a similarity in `0.0..=1.0`, shown as a percentage.
pub fn format_memory_for_display(
    id: &str,
    text: &str,
    metadata: &Metadata,
    score: Option<f32>,
) -> String {
    let mut out = format!("📝 Memory ID: {}\n", id);

    if let Some(score) = score {
        out.push_str(&format!("🎯 Relevance: {:.2}%\n", score * 100.0));
    }

    let created = metadata
        .get("timestamp")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown");
    let category = metadata
        .get("category")
        .and_then(|v| v.as_str())
        .unwrap_or("general");
    out.push_str(&format!("📅 Created: {}\n", created));
    out.push_str(&format!("🏷️ Category: {}\n", category));

    let keywords = metadata_keywords(metadata);
    if !keywords.is_empty() {
        out.push_str(&format!("🔑 Keywords: {}\n", keywords.join(", ")));
    }

    out.push_str(&format!("\n💭 Memory:\n{}\n", text));
    out.push_str(&"-".repeat(50));
    out
}

/// Keywords from vector metadata, stored either as a joined string or a list.
pub fn metadata_keywords(metadata: &Metadata) -> Vec<String> {
    match metadata.get("keywords") {
        Some(serde_json::Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_keywords_drops_stop_words() {
        let keywords = extract_keywords(
            "Remember to run npm build before deploying the application to production",
        );
        assert_eq!(keywords, vec!["remember", "run", "npm", "build", "before"]);
        assert!(!keywords.iter().any(|k| k == "to" || k == "the"));
        assert!(keywords.iter().all(|k| k.len() > 2));
    }

    #[test]
    fn test_extract_keywords_ranks_by_frequency() {
        let keywords = extract_keywords("alpha beta beta gamma gamma gamma alpha delta");
        assert_eq!(keywords, vec!["gamma", "alpha", "beta", "delta"]);
    }

    #[test]
    fn test_extract_keywords_empty() {
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("a an to of").is_empty());
    }

    #[test]
    fn test_categorize_work() {
        assert_eq!(
            categorize("Meeting with Sarah tomorrow at 2pm to discuss the Q4 project roadmap"),
            Category::Work
        );
    }

    #[test]
    fn test_categorize_general_when_nothing_matches() {
        assert_eq!(categorize("Sunny skies over the hills"), Category::General);
    }

    #[test]
    fn test_categorize_tie_uses_declaration_order() {
        // one technical trigger ("bug"), one work trigger ("client")
        assert_eq!(categorize("client bug"), Category::Technical);
    }

    #[test]
    fn test_categorize_multiword_triggers() {
        assert_eq!(
            categorize("Note to self: don't forget the keys"),
            Category::Reminder
        );
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("hello brave new world", 13), "hello brave...");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn test_format_memory_for_display() {
        let metadata = json!({
            "timestamp": "2024-01-01T12:00:00",
            "category": "work",
            "keywords": "meeting, project",
        });
        let out = format_memory_for_display(
            "mem_1",
            "Team sync",
            metadata.as_object().unwrap(),
            Some(0.8734),
        );
        assert!(out.starts_with("📝 Memory ID: mem_1\n"));
        assert!(out.contains("🎯 Relevance: 87.34%"));
        assert!(out.contains("📅 Created: 2024-01-01T12:00:00"));
        assert!(out.contains("🏷️ Category: work"));
        assert!(out.contains("🔑 Keywords: meeting, project"));
        assert!(out.contains("\n💭 Memory:\nTeam sync\n"));
        assert!(out.ends_with(&"-".repeat(50)));
    }

    #[test]
    fn test_format_without_score_or_metadata() {
        let out = format_memory_for_display("mem_2", "x", &Metadata::new(), None);
        assert!(!out.contains("Relevance"));
        assert!(!out.contains("Keywords"));
        assert!(out.contains("📅 Created: Unknown"));
        assert!(out.contains("🏷️ Category: general"));
    }

    #[test]
    fn test_metadata_keywords_accepts_list() {
        let metadata = json!({ "keywords": ["a", "b"] });
        assert_eq!(metadata_keywords(metadata.as_object().unwrap()), vec!["a", "b"]);
    }
}
