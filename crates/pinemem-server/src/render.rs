//! Human-readable rendering of service outcomes.

use crate::service::{memory_text, MemoryListing, RecallResult, StoredMemory};
use pinemem_memory::text::format_memory_for_display;
use pinemem_memory::LocalIndexStats;

pub fn stored(memory: &StoredMemory) -> String {
    format!(
        "✅ Memory stored successfully!\n\n\
         📝 Memory ID: {}\n\
         🏷️ Category: {}\n\
         🔑 Keywords: {}\n\
         📅 Timestamp: {}\n\n\
         Your memory has been securely stored and indexed for future retrieval.",
        memory.id,
        memory.category,
        memory.keywords.join(", "),
        memory.timestamp
    )
}

pub fn listing(listing: &MemoryListing) -> String {
    if listing.total == 0 {
        return "📭 No memories stored yet. Use 'remember_this' to store your first memory!"
            .to_string();
    }
    if listing.memories.is_empty() {
        if let Some(category) = listing.category {
            return format!("📭 No memories found in category '{}'", category);
        }
    }

    let mut out = format!("📚 Showing {} memories", listing.memories.len());
    if let Some(category) = listing.category {
        out.push_str(&format!(" (category: {})", category));
    }
    out.push_str(&format!(" out of {} total:\n\n", listing.total));

    for memory in &listing.memories {
        out.push_str(&format_memory_for_display(
            &memory.id,
            memory_text(&memory.metadata),
            &memory.metadata,
            None,
        ));
        out.push('\n');
    }

    out.push_str(&stats_footer(&listing.stats));
    out
}

fn stats_footer(stats: &LocalIndexStats) -> String {
    let mut out = format!(
        "\n📊 Memory Statistics:\nTotal memories: {}\n",
        stats.total_memories
    );
    if !stats.categories.is_empty() {
        let parts: Vec<String> = stats
            .categories
            .iter()
            .map(|(category, count)| format!("{}: {}", category, count))
            .collect();
        out.push_str(&format!("Categories: {}", parts.join(", ")));
    }
    out
}

pub fn recall(result: &RecallResult) -> String {
    if result.matches.is_empty() {
        return "🤔 No relevant memories found. Try rephrasing your query or store more memories!"
            .to_string();
    }

    let mut out = format!(
        "🔍 Found {} relevant memories for: '{}'\n\n",
        result.matches.len(),
        result.query
    );
    for (i, memory) in result.matches.iter().enumerate() {
        out.push_str(&format!("#{} ", i + 1));
        out.push_str(&format_memory_for_display(
            &memory.id,
            memory_text(&memory.metadata),
            &memory.metadata,
            Some(memory.score),
        ));
        out.push('\n');
    }

    let context = &result.context;
    let mut applied = Vec::new();
    if let Some(category) = context.category {
        applied.push(format!("category = {}", category));
    }
    if !context.exact_phrases.is_empty() {
        let phrases: Vec<String> = context
            .exact_phrases
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect();
        applied.push(format!("phrases = {}", phrases.join(", ")));
    }
    if !applied.is_empty() {
        out.push_str(&format!("\n🔎 Search filters applied: {}", applied.join("; ")));
    }
    if let Some(period) = context.time_period {
        out.push_str(&format!(
            "\n🕒 Time period noted: {} (not used for filtering)",
            period
        ));
    }
    out
}
