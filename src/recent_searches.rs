// Recent searches, most recent first, persisted as JSON in the data directory

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::models::SearchParams;

const STORAGE_FILE: &str = "blassa_recent_searches.json";
pub const MAX_SEARCHES: usize = 5;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentSearch {
    #[serde(default = "new_id")]
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default = "default_passengers")]
    pub passengers: u32,
    pub timestamp: i64, // epoch millis
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_passengers() -> u32 {
    1
}

impl RecentSearch {
    fn same_route(&self, from: &str, to: &str) -> bool {
        self.from.to_lowercase() == from.to_lowercase() && self.to.to_lowercase() == to.to_lowercase()
    }
}

pub struct RecentSearches {
    path: PathBuf,
    entries: RwLock<Vec<RecentSearch>>,
}

// Entries that no longer match the expected shape are skipped individually
fn parse_entries(content: &str) -> Result<Vec<RecentSearch>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(content)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RecentSearch>(value).ok())
        .take(MAX_SEARCHES)
        .collect())
}

impl RecentSearches {
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(STORAGE_FILE);
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match parse_entries(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Dropping unreadable recent searches file");
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to remove recent searches file");
                    }
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        tracing::debug!(count = entries.len(), "Loaded recent searches");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    // Storage failures never reach the caller; the in-memory list stays authoritative
    async fn persist(&self, entries: &[RecentSearch]) {
        let write = async {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string(entries)?;
            tokio::fs::write(&self.path, content).await?;
            anyhow::Ok(())
        };
        if let Err(e) = write.await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist recent searches");
        }
    }

    pub async fn list(&self) -> Vec<RecentSearch> {
        self.entries.read().await.clone()
    }

    /// Records a search at the front. An earlier entry for the same route
    /// (case-insensitive) is replaced.
    pub async fn add(&self, params: &SearchParams) -> Vec<RecentSearch> {
        let search = RecentSearch {
            id: new_id(),
            from: params.from.clone(),
            to: params.to.clone(),
            date: params.date.clone(),
            passengers: params.passengers,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let mut entries = self.entries.write().await;
        entries.retain(|s| !s.same_route(&search.from, &search.to));
        entries.insert(0, search);
        entries.truncate(MAX_SEARCHES);
        self.persist(&entries).await;
        entries.clone()
    }

    /// Returns false when no entry had that id.
    pub async fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|s| s.id != id);
        let removed = entries.len() != before;
        if removed {
            self.persist(&entries).await;
        }
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove recent searches file"),
        }
    }
}
