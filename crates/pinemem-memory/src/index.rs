//! Local side-index of stored memories.
//!
//! A single JSON file records which memory ids exist, with a short excerpt,
//! category and keywords for each. Every mutation rewrites the whole file
//! under a process-local lock; reads take no lock.
//!
//! The public operations never fail: a missing file reads as empty, and a
//! malformed file is reported with a warning and treated as empty (it is
//! never overwritten).

use crate::{Category, IndexedMemory, MemoryError, MemoryRecord, Result};
use chrono::{DateTime, Utc};
use pinemem_core::paths;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// On-disk layout of the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFile {
    /// Ids in insertion order.
    #[serde(rename = "vector_ids", default)]
    pub ids: Vec<String>,

    #[serde(rename = "memories", default)]
    pub records: BTreeMap<String, MemoryRecord>,

    #[serde(with = "crate::timestamp", default = "Utc::now")]
    pub last_updated: DateTime<Utc>,

    /// Always `ids.len()`.
    #[serde(rename = "total_memories", default)]
    pub total_count: usize,
}

impl IndexFile {
    /// An empty aggregate.
    pub fn empty() -> Self {
        Self {
            ids: Vec::new(),
            records: BTreeMap::new(),
            last_updated: Utc::now(),
            total_count: 0,
        }
    }

    fn touch(&mut self) {
        self.total_count = self.ids.len();
        self.last_updated = Utc::now();
    }

    /// Drop dangling ids and orphan records so that `ids` and the record
    /// keys are the same set. Returns the number of entries dropped.
    fn reconcile(&mut self) -> usize {
        let before = self.ids.len() + self.records.len();

        let mut seen = HashSet::new();
        let records = &self.records;
        self.ids
            .retain(|id| records.contains_key(id) && seen.insert(id.clone()));
        self.records.retain(|id, _| seen.contains(id));
        self.total_count = self.ids.len();

        before - self.ids.len() - self.records.len()
    }

    /// Records in insertion order, with ids attached.
    fn iter(&self) -> impl Iterator<Item = IndexedMemory> + '_ {
        self.ids.iter().filter_map(|id| {
            self.records.get(id).map(|record| IndexedMemory {
                id: id.clone(),
                record: record.clone(),
            })
        })
    }
}

/// Summary returned by [`LocalIndex::stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalIndexStats {
    pub total_memories: usize,

    /// `None` when the file does not exist yet.
    pub last_updated: Option<DateTime<Utc>>,

    /// Count per category; categories with no records are absent.
    pub categories: BTreeMap<Category, usize>,

    pub storage_location: PathBuf,
}

/// The local memory index.
pub struct LocalIndex {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalIndex {
    /// Index stored at `path`. Nothing is read until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file. `Ok(None)` when it does not exist.
    async fn load(&self) -> Result<Option<IndexFile>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut file: IndexFile = serde_json::from_str(&data)?;
        let dropped = file.reconcile();
        if dropped > 0 {
            warn!(
                "Index file {} had {} inconsistent entries; ignoring them",
                self.path.display(),
                dropped
            );
        }
        Ok(Some(file))
    }

    /// Persist `file` by writing a sibling temp file and renaming it over
    /// the target.
    async fn save(&self, file: &IndexFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_string_pretty(file)?;
        let tmp = paths::temp_sibling(&self.path);
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read the current contents, treating a missing file as empty.
    ///
    /// Unlike the other operations this reports a malformed file as an error.
    pub async fn read(&self) -> Result<IndexFile> {
        Ok(self.load().await?.unwrap_or_else(IndexFile::empty))
    }

    /// Load-apply-save under the write lock. `apply` returns whether it
    /// changed anything; unchanged files are not rewritten.
    async fn mutate<F>(&self, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut IndexFile) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?.unwrap_or_else(IndexFile::empty);
        if !apply(&mut file) {
            return Ok(false);
        }
        file.touch();
        self.save(&file).await?;
        Ok(true)
    }

    /// Like [`read`](Self::read) but logs and returns `None` on failure.
    async fn snapshot(&self, operation: &str) -> Option<IndexFile> {
        match self.read().await {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(
                    "Could not read memory index {} during {}: {}",
                    self.path.display(),
                    operation,
                    e
                );
                None
            }
        }
    }

    /// Record a newly stored memory. Returns `false` if `id` is already
    /// present or the file could not be updated.
    pub async fn add(
        &self,
        id: &str,
        text: &str,
        category: Category,
        keywords: Vec<String>,
    ) -> bool {
        let record = MemoryRecord::new(text, category, keywords);
        let result = self
            .mutate(|file| {
                if file.records.contains_key(id) {
                    return false;
                }
                file.ids.push(id.to_string());
                file.records.insert(id.to_string(), record);
                true
            })
            .await;

        match result {
            Ok(true) => {
                debug!("Indexed memory {}", id);
                true
            }
            Ok(false) => {
                debug!("Memory {} is already indexed", id);
                false
            }
            Err(e) => {
                warn!("Failed to index memory {}: {}", id, e);
                false
            }
        }
    }

    /// Forget `id`. Returns `false` if it was not present or the file could
    /// not be updated.
    pub async fn remove(&self, id: &str) -> bool {
        let result = self
            .mutate(|file| {
                if file.records.remove(id).is_none() {
                    return false;
                }
                file.ids.retain(|i| i != id);
                true
            })
            .await;

        match result {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to remove memory {} from index: {}", id, e);
                false
            }
        }
    }

    /// All ids in insertion order.
    pub async fn list_ids(&self) -> Vec<String> {
        self.snapshot("list")
            .await
            .map(|file| file.ids)
            .unwrap_or_default()
    }

    /// Look up one record.
    pub async fn get(&self, id: &str) -> Option<MemoryRecord> {
        self.snapshot("get")
            .await
            .and_then(|mut file| file.records.remove(id))
    }

    /// Records with exactly `category`, in insertion order.
    pub async fn find_by_category(&self, category: Category) -> Vec<IndexedMemory> {
        let Some(file) = self.snapshot("category scan").await else {
            return Vec::new();
        };
        file.iter()
            .filter(|m| m.record.category == category)
            .collect()
    }

    /// Records whose excerpt contains `term` or whose keywords include it,
    /// ignoring case, in insertion order. A blank term matches nothing.
    pub async fn find_by_keyword(&self, term: &str) -> Vec<IndexedMemory> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        let Some(file) = self.snapshot("keyword scan").await else {
            return Vec::new();
        };
        file.iter()
            .filter(|m| {
                m.record.text_excerpt.to_lowercase().contains(&term)
                    || m.record.keywords.iter().any(|k| k.to_lowercase() == term)
            })
            .collect()
    }

    /// Count, last update and category histogram.
    pub async fn stats(&self) -> LocalIndexStats {
        let file = match self.load().await {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    "Could not read memory index {} during stats: {}",
                    self.path.display(),
                    e
                );
                None
            }
        };

        let mut categories = BTreeMap::new();
        let (total_memories, last_updated) = match &file {
            Some(file) => {
                for record in file.records.values() {
                    *categories.entry(record.category).or_insert(0) += 1;
                }
                (file.total_count, Some(file.last_updated))
            }
            None => (0, None),
        };

        LocalIndexStats {
            total_memories,
            last_updated,
            categories,
            storage_location: self.path.clone(),
        }
    }
}

impl std::fmt::Debug for LocalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIndex").field("path", &self.path).finish()
    }
}

/// Whether a [`LocalIndex::read`] error means the file content is malformed.
pub fn is_corrupt(err: &MemoryError) -> bool {
    matches!(err, MemoryError::Json(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn index() -> (TempDir, LocalIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::new(dir.path().join("memory_ids.json"));
        (dir, index)
    }

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let (_dir, index) = index();
        let text = "x".repeat(700);
        assert!(index.add("mem_1", &text, Category::Technical, kw(&["rust"])).await);

        let record = index.get("mem_1").await.unwrap();
        assert_eq!(record.text_excerpt, "x".repeat(500));
        assert_eq!(record.category, Category::Technical);
        assert_eq!(record.keywords, kw(&["rust"]));
        assert!(index.get("mem_2").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_add_is_rejected() {
        let (_dir, index) = index();
        assert!(index.add("mem_1", "first", Category::Work, vec![]).await);
        let before = index.read().await.unwrap();

        assert!(!index.add("mem_1", "second", Category::Idea, vec![]).await);
        let after = index.read().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_counts_stay_consistent() {
        let (_dir, index) = index();
        for i in 0..5 {
            index
                .add(&format!("mem_{i}"), "text", Category::General, vec![])
                .await;
        }
        assert!(index.remove("mem_1").await);
        assert!(index.remove("mem_3").await);
        index.add("mem_9", "text", Category::General, vec![]).await;

        let file = index.read().await.unwrap();
        assert_eq!(file.total_count, file.ids.len());
        assert_eq!(file.ids.len(), file.records.len());
        assert_eq!(index.list_ids().await, kw(&["mem_0", "mem_2", "mem_4", "mem_9"]));
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let (_dir, index) = index();
        assert!(!index.remove("nope").await);
        assert!(!index.path().exists());

        index.add("mem_1", "text", Category::Work, vec![]).await;
        let before = index.read().await.unwrap();
        assert!(!index.remove("nope").await);
        assert_eq!(index.read().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_find_by_category() {
        let (_dir, index) = index();
        index.add("mem_t", "a bug", Category::Technical, vec![]).await;
        index.add("mem_w", "a meeting", Category::Work, vec![]).await;

        let found = index.find_by_category(Category::Technical).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "mem_t");
        assert!(index.find_by_category(Category::Idea).await.is_empty());
    }

    #[tokio::test]
    async fn test_scans_follow_insertion_order() {
        let (_dir, index) = index();
        // ids that sort opposite to insertion order
        for id in ["mem_c", "mem_b", "mem_a"] {
            index.add(id, "note", Category::Work, vec![]).await;
        }
        let ids: Vec<String> = index
            .find_by_category(Category::Work)
            .await
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, kw(&["mem_c", "mem_b", "mem_a"]));
    }

    #[tokio::test]
    async fn test_find_by_keyword() {
        let (_dir, index) = index();
        index
            .add("mem_1", "Deploy the API on Friday", Category::Technical, kw(&["deploy"]))
            .await;
        index
            .add("mem_2", "Lunch with Sam", Category::Personal, kw(&["lunch", "sam"]))
            .await;

        let hits = index.find_by_keyword("api").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "mem_1");

        let hits = index.find_by_keyword("SAM").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "mem_2");

        assert!(index.find_by_keyword("  ").await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let (_dir, index) = index();
        let stats = index.stats().await;
        assert_eq!(stats.total_memories, 0);
        assert!(stats.categories.is_empty());
        assert!(stats.last_updated.is_none());
        assert_eq!(stats.storage_location, index.path());
    }

    #[tokio::test]
    async fn test_stats_histogram() {
        let (_dir, index) = index();
        index.add("mem_1", "a", Category::Work, vec![]).await;
        index.add("mem_2", "b", Category::Work, vec![]).await;
        index.add("mem_3", "c", Category::Idea, vec![]).await;

        let stats = index.stats().await;
        assert_eq!(stats.total_memories, 3);
        assert_eq!(stats.categories.get(&Category::Work), Some(&2));
        assert_eq!(stats.categories.get(&Category::Idea), Some(&1));
        assert!(stats.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_roundtrip_through_file() {
        let (dir, index) = index();
        index.add("mem_1", "alpha", Category::Learning, kw(&["alpha"])).await;
        index.add("mem_2", "beta", Category::Reference, kw(&["beta"])).await;
        let written = index.read().await.unwrap();

        let reopened = LocalIndex::new(dir.path().join("memory_ids.json"));
        let reread = reopened.read().await.unwrap();
        assert_eq!(reread.ids, written.ids);
        assert_eq!(reread.records, written.records);
    }

    #[tokio::test]
    async fn test_file_layout() {
        let (_dir, index) = index();
        index.add("mem_1", "alpha", Category::Work, kw(&["alpha"])).await;

        let raw = std::fs::read_to_string(index.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["vector_ids"], serde_json::json!(["mem_1"]));
        assert_eq!(value["total_memories"], 1);
        assert_eq!(value["memories"]["mem_1"]["text"], "alpha");
        assert_eq!(value["memories"]["mem_1"]["category"], "work");
        assert!(value["last_updated"].is_string());
        assert!(!paths::temp_sibling(index.path()).exists());
    }

    #[tokio::test]
    async fn test_reads_legacy_naive_timestamps() {
        let (_dir, index) = index();
        std::fs::write(
            index.path(),
            r#"{
                "vector_ids": ["mem_1"],
                "memories": {
                    "mem_1": {
                        "text": "old note",
                        "category": "reminder",
                        "keywords": ["old", "note"],
                        "created_at": "2024-05-01T09:30:00.123456"
                    }
                },
                "last_updated": "2024-05-01T09:30:00.123456",
                "total_memories": 1
            }"#,
        )
        .unwrap();

        let record = index.get("mem_1").await.unwrap();
        assert_eq!(record.category, Category::Reminder);
        assert_eq!(index.list_ids().await, kw(&["mem_1"]));
    }

    #[tokio::test]
    async fn test_malformed_file_reads_empty_and_is_not_overwritten() {
        let (_dir, index) = index();
        std::fs::write(index.path(), "{ this is not json").unwrap();

        assert!(index.list_ids().await.is_empty());
        assert!(index.get("mem_1").await.is_none());
        assert!(index.find_by_category(Category::Work).await.is_empty());
        assert_eq!(index.stats().await.total_memories, 0);
        assert!(!index.add("mem_1", "text", Category::Work, vec![]).await);
        assert!(!index.remove("mem_1").await);

        let raw = std::fs::read_to_string(index.path()).unwrap();
        assert_eq!(raw, "{ this is not json");
        assert!(is_corrupt(&index.read().await.unwrap_err()));
    }

    #[tokio::test]
    async fn test_inconsistent_file_is_reconciled_on_load() {
        let (_dir, index) = index();
        std::fs::write(
            index.path(),
            r#"{
                "vector_ids": ["mem_1", "mem_dangling", "mem_1"],
                "memories": {
                    "mem_1": { "text": "kept", "category": "work", "keywords": [], "created_at": "2024-01-01T00:00:00+00:00" },
                    "mem_orphan": { "text": "orphan", "category": "idea", "keywords": [], "created_at": "2024-01-01T00:00:00+00:00" }
                },
                "last_updated": "2024-01-01T00:00:00+00:00",
                "total_memories": 7
            }"#,
        )
        .unwrap();

        let file = index.read().await.unwrap();
        assert_eq!(file.ids, kw(&["mem_1"]));
        assert_eq!(file.records.len(), 1);
        assert_eq!(file.total_count, 1);
    }

    #[tokio::test]
    async fn test_missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::new(dir.path().join("nested").join("ids.json"));
        assert!(index.add("mem_1", "text", Category::General, vec![]).await);
        assert!(index.path().exists());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let (_dir, index) = index();
        let index = Arc::new(index);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let index = Arc::clone(&index);
                tokio::spawn(async move {
                    index
                        .add(&format!("mem_{i:02}"), "text", Category::General, vec![])
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let file = index.read().await.unwrap();
        assert_eq!(file.ids.len(), 20);
        assert_eq!(file.total_count, 20);
    }
}
