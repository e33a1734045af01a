//! Terminal rendering utilities.

use console::{style, Emoji};
use pinemem_memory::text::truncate_text;
use pinemem_memory::{IndexedMemory, LocalIndexStats, StoreStats};

pub static CHECK: Emoji = Emoji("✓", "+");
pub static CROSS: Emoji = Emoji("✗", "x");
pub static WARN: Emoji = Emoji("⚠", "!");

/// Result of a single diagnostic or status check.
pub enum Status {
    Ok,
    Warn,
    Error,
}

/// Print an indented status line.
pub fn status_line(status: Status, message: impl std::fmt::Display) {
    let marker = match status {
        Status::Ok => style(CHECK).green(),
        Status::Warn => style(WARN).yellow(),
        Status::Error => style(CROSS).red(),
    };
    println!("  {} {}", marker, message);
}

/// Print a section heading.
pub fn heading(title: &str) {
    println!("\n{}", style(title).bold());
}

/// One line per local search hit.
pub fn search_hit(memory: &IndexedMemory) -> String {
    format!(
        "{} [{}] {}\n    {}",
        style(&memory.id).cyan(),
        memory.record.category,
        memory.record.created_at.format("%Y-%m-%d %H:%M"),
        truncate_text(&memory.record.text_excerpt, 120)
    )
}

/// Local index statistics block.
pub fn local_stats(stats: &LocalIndexStats) -> String {
    let mut out = format!("  Total memories: {}\n", stats.total_memories);
    match stats.last_updated {
        Some(at) => out.push_str(&format!("  Last updated: {}\n", at.to_rfc3339())),
        None => out.push_str("  Last updated: never\n"),
    }
    if !stats.categories.is_empty() {
        out.push_str("  Categories:\n");
        for (category, count) in &stats.categories {
            out.push_str(&format!("    {:<10} {}\n", category.as_str(), count));
        }
    }
    out.push_str(&format!(
        "  Storage location: {}",
        stats.storage_location.display()
    ));
    out
}

/// Vector store statistics block.
pub fn store_stats(stats: &StoreStats) -> String {
    let mut out = format!(
        "  Memories in namespace: {}\n  Vectors in index: {}",
        stats.total_memories, stats.total_vectors
    );
    if let Some(dimension) = stats.dimension {
        out.push_str(&format!("\n  Dimension: {}", dimension));
    }
    if let Some(fullness) = stats.index_fullness {
        out.push_str(&format!("\n  Index fullness: {:.2}%", fullness * 100.0));
    }
    out
}
