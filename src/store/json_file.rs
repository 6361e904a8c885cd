use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::document::DocumentStore;
use crate::error::{Result, SlotError};
use crate::state::{Bracket, BracketDocument, BracketFilter};

const SCHEMA_VERSION: u32 = 1;

/// On-disk layout of the bracket file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BracketFile {
    /// Schema version for migrations
    version: u32,

    /// Last write timestamp
    last_updated: u64,

    /// Bracket ID -> versioned document
    brackets: HashMap<String, BracketDocument>,
}

impl Default for BracketFile {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_updated: current_timestamp(),
            brackets: HashMap::new(),
        }
    }
}

/// Document store persisted to a single JSON file.
///
/// Writers are serialized behind one mutex. A mutation is only applied in
/// memory once the file holding it has been renamed into place.
pub struct JsonFileDocumentStore {
    path: String,
    file: Mutex<BracketFile>,
}

impl JsonFileDocumentStore {
    /// Load from a JSON file, or start empty if it does not exist
    pub async fn open(path: &str) -> Result<Self> {
        let file = match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let file: BracketFile =
                    serde_json::from_str(&content).map_err(|e| SlotError::StateParse {
                        path: path.to_string(),
                        source: e,
                    })?;
                if file.version != SCHEMA_VERSION {
                    warn!(
                        "Bracket file {} has schema version {}, expected {}",
                        path, file.version, SCHEMA_VERSION
                    );
                }
                info!("Loaded {} brackets from {}", file.brackets.len(), path);
                file
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No bracket file at {}, starting empty", path);
                BracketFile::default()
            }
            Err(e) => {
                return Err(SlotError::StateLoad {
                    path: path.to_string(),
                    source: e,
                })
            }
        };

        Ok(Self {
            path: path.to_string(),
            file: Mutex::new(file),
        })
    }

    /// Write the file atomically via a temp file and rename
    async fn persist(&self, file: &BracketFile, bracket_id: &str) -> Result<()> {
        let write_failed = |e: std::io::Error| SlotError::WriteConflict {
            bracket_id: bracket_id.to_string(),
            message: e.to_string(),
        };

        let content = serde_json::to_string_pretty(file)?;
        let temp_path = format!("{}.tmp", self.path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(write_failed)?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(write_failed)?;

        debug!("Persisted {} brackets to {}", file.brackets.len(), self.path);
        Ok(())
    }

    /// Apply `change` to a copy of the file, persist it, then commit in memory
    async fn mutate<T>(
        &self,
        bracket_id: &str,
        change: impl FnOnce(&mut BracketFile) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.file.lock().await;
        let mut next = guard.clone();
        let value = change(&mut next)?;
        next.last_updated = current_timestamp();

        self.persist(&next, bracket_id).await?;
        *guard = next;
        Ok(value)
    }
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn get(&self, bracket_id: &str) -> Result<BracketDocument> {
        let file = self.file.lock().await;
        file.brackets
            .get(bracket_id)
            .cloned()
            .ok_or_else(|| SlotError::NotFound {
                bracket_id: bracket_id.to_string(),
            })
    }

    async fn compare_and_set(
        &self,
        bracket_id: &str,
        expected_version: u64,
        bracket: Bracket,
    ) -> Result<u64> {
        self.mutate(bracket_id, |file| {
            let doc = file
                .brackets
                .get_mut(bracket_id)
                .ok_or_else(|| SlotError::NotFound {
                    bracket_id: bracket_id.to_string(),
                })?;

            if doc.version != expected_version {
                return Err(SlotError::VersionConflict {
                    bracket_id: bracket_id.to_string(),
                    expected: expected_version,
                    actual: doc.version,
                });
            }

            doc.version += 1;
            doc.bracket = bracket;
            Ok(doc.version)
        })
        .await
    }

    async fn insert(&self, bracket: Bracket) -> Result<BracketDocument> {
        let bracket_id = bracket.id.clone();
        self.mutate(&bracket_id, |file| {
            if file.brackets.contains_key(&bracket.id) {
                return Err(SlotError::Internal {
                    message: format!("bracket id {} already exists", bracket.id),
                });
            }
            let doc = BracketDocument {
                version: 1,
                bracket,
            };
            file.brackets.insert(doc.bracket.id.clone(), doc.clone());
            Ok(doc)
        })
        .await
    }

    async fn remove(&self, bracket_id: &str) -> Result<()> {
        self.mutate(bracket_id, |file| {
            file.brackets
                .remove(bracket_id)
                .map(|_| ())
                .ok_or_else(|| SlotError::NotFound {
                    bracket_id: bracket_id.to_string(),
                })
        })
        .await
    }

    async fn list(&self, filter: &BracketFilter) -> Result<Vec<BracketDocument>> {
        let file = self.file.lock().await;
        Ok(file
            .brackets
            .values()
            .filter(|doc| filter.matches(&doc.bracket))
            .cloned()
            .collect())
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NewBracket, Visibility};

    fn temp_path() -> String {
        std::env::temp_dir()
            .join(format!("slotbook-{}.json", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned()
    }

    fn bracket() -> Bracket {
        NewBracket {
            name: "Weekend".to_string(),
            platform: "youtube".to_string(),
            visibility: Visibility::Private,
            slot_count: 3,
            first_start: chrono::Utc::now(),
            interval_minutes: 20,
        }
        .into_bracket("Host")
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let store = JsonFileDocumentStore::open(&temp_path()).await.unwrap();
        let all = store.list(&BracketFilter::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let path = temp_path();
        let store = JsonFileDocumentStore::open(&path).await.unwrap();
        let doc = store.insert(bracket()).await.unwrap();
        let id = doc.bracket.id.clone();

        let mut changed = doc.bracket.clone();
        changed.slots[0].seat_a = "Alice".to_string();
        changed.slots[0].refresh_status();
        store.compare_and_set(&id, 1, changed).await.unwrap();

        let reopened = JsonFileDocumentStore::open(&path).await.unwrap();
        let stored = reopened.get(&id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.bracket.slots[0].seat_a, "Alice");

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_conflicting_write_leaves_file_untouched() {
        let path = temp_path();
        let store = JsonFileDocumentStore::open(&path).await.unwrap();
        let doc = store.insert(bracket()).await.unwrap();
        let id = doc.bracket.id.clone();

        let mut changed = doc.bracket.clone();
        changed.name = "Stale".to_string();
        let err = store.compare_and_set(&id, 7, changed).await.unwrap_err();
        assert!(matches!(err, SlotError::VersionConflict { actual: 1, .. }));

        let reopened = JsonFileDocumentStore::open(&path).await.unwrap();
        assert_eq!(reopened.get(&id).await.unwrap().bracket.name, "Weekend");

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_write_to_removed_bracket_is_not_found() {
        let path = temp_path();
        let store = JsonFileDocumentStore::open(&path).await.unwrap();
        let doc = store.insert(bracket()).await.unwrap();
        let id = doc.bracket.id.clone();
        store.remove(&id).await.unwrap();

        let err = store
            .compare_and_set(&id, doc.version, doc.bracket)
            .await
            .unwrap_err();
        assert!(matches!(err, SlotError::NotFound { .. }));

        let reopened = JsonFileDocumentStore::open(&path).await.unwrap();
        assert!(reopened.get(&id).await.is_err());

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_unwritable_path_is_write_conflict() {
        let path = std::env::temp_dir()
            .join(format!("slotbook-missing-{}", uuid::Uuid::new_v4()))
            .join("brackets.json")
            .to_string_lossy()
            .into_owned();
        let store = JsonFileDocumentStore::open(&path).await.unwrap();

        let err = store.insert(bracket()).await.unwrap_err();
        assert!(matches!(err, SlotError::WriteConflict { .. }));
        assert!(store.list(&BracketFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_parse_error() {
        let path = temp_path();
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let result = JsonFileDocumentStore::open(&path).await;
        assert!(matches!(result, Err(SlotError::StateParse { .. })));

        tokio::fs::remove_file(&path).await.ok();
    }
}
