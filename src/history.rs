// src/history.rs
//
// Flat-file run history: one JSON document holding the newest runs first,
// capped so the file cannot grow without bound. Writes are serialized
// through an internal lock.
use crate::models::{PipelineResult, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub query: String,
    pub created_at: String,
    pub results: Vec<PipelineResult>,
    pub logs: Vec<String>,
}

/// Listing row: everything except the result payload.
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub id: i64,
    pub query: String,
    pub created_at: String,
    pub total: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    last_id: i64,
    entries: Vec<HistoryEntry>,
}

pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: PathBuf, max_entries: usize) -> Self {
        Self {
            path,
            max_entries,
            write_lock: Mutex::new(()),
        }
    }

    /// Persists one finished run and returns its id. Newest entries sit at
    /// the front; the oldest fall off past `max_entries`.
    pub async fn save(
        &self,
        query: &str,
        results: Vec<PipelineResult>,
        logs: Vec<String>,
    ) -> Result<i64> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await;

        let id = file.last_id + 1;
        file.last_id = id;
        file.entries.insert(
            0,
            HistoryEntry {
                id,
                query: query.to_string(),
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                results,
                logs,
            },
        );
        file.entries.truncate(self.max_entries);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_vec_pretty(&file)?;
        tokio::fs::write(&self.path, serialized).await?;
        Ok(id)
    }

    pub async fn list(&self, limit: usize) -> Vec<HistorySummary> {
        self.load()
            .await
            .entries
            .iter()
            .take(limit)
            .map(|entry| HistorySummary {
                id: entry.id,
                query: entry.query.clone(),
                created_at: entry.created_at.clone(),
                total: entry.results.len(),
            })
            .collect()
    }

    pub async fn get(&self, id: i64) -> Option<HistoryEntry> {
        self.load()
            .await
            .entries
            .into_iter()
            .find(|entry| entry.id == id)
    }

    /// Missing file means empty history; a corrupt file is logged and
    /// treated the same so one bad write cannot brick the endpoint.
    async fn load(&self) -> HistoryFile {
        let content = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return HistoryFile::default(),
        };
        match serde_json::from_slice(&content) {
            Ok(file) => file,
            Err(e) => {
                warn!("History file {} is corrupt ({}), starting fresh", self.path.display(), e);
                HistoryFile::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str, max_entries: usize) -> HistoryStore {
        let path = std::env::temp_dir()
            .join(format!("contact-scout-history-{}-{}", std::process::id(), name))
            .join("history.json");
        HistoryStore::new(path, max_entries)
    }

    async fn cleanup(store: &HistoryStore) {
        if let Some(parent) = store.path.parent() {
            let _ = tokio::fs::remove_dir_all(parent).await;
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_and_newest_entry_lists_first() {
        let store = temp_store("sequential", 200);
        cleanup(&store).await;

        let first = store.save("first query", Vec::new(), Vec::new()).await.unwrap();
        let second = store.save("second query", Vec::new(), Vec::new()).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let listed = store.list(30).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].query, "second query");
        assert_eq!(listed[1].id, 1);

        cleanup(&store).await;
    }

    #[tokio::test]
    async fn oldest_entries_fall_off_past_the_cap() {
        let store = temp_store("cap", 3);
        cleanup(&store).await;

        for i in 0..5 {
            store
                .save(&format!("query {i}"), Vec::new(), Vec::new())
                .await
                .unwrap();
        }

        let listed = store.list(30).await;
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].query, "query 4");
        // Ids keep counting even after old entries are dropped.
        assert_eq!(store.save("query 5", Vec::new(), Vec::new()).await.unwrap(), 6);

        cleanup(&store).await;
    }

    #[tokio::test]
    async fn get_returns_full_entry_or_none() {
        let store = temp_store("get", 200);
        cleanup(&store).await;

        let id = store
            .save("lookup", Vec::new(), vec!["line".to_string()])
            .await
            .unwrap();
        let entry = store.get(id).await.unwrap();
        assert_eq!(entry.query, "lookup");
        assert_eq!(entry.logs, vec!["line"]);
        assert!(store.get(999).await.is_none());

        cleanup(&store).await;
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let store = temp_store("corrupt", 200);
        cleanup(&store).await;

        tokio::fs::create_dir_all(store.path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&store.path, b"not json").await.unwrap();

        assert!(store.list(30).await.is_empty());
        assert_eq!(store.save("fresh", Vec::new(), Vec::new()).await.unwrap(), 1);

        cleanup(&store).await;
    }
}
