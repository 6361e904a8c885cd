use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::document::DocumentStore;
use crate::error::{Result, SlotError};
use crate::state::{Bracket, BracketDocument, BracketFilter};

/// Process-local document store.
///
/// Each compare-and-set runs while holding the shard lock of its entry, so
/// concurrent writers to one bracket are serialized.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, BracketDocument>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, bracket_id: &str) -> Result<BracketDocument> {
        self.documents
            .get(bracket_id)
            .map(|doc| doc.clone())
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
        let mut doc = self
            .documents
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
        debug!("Bracket {} now at version {}", bracket_id, doc.version);
        Ok(doc.version)
    }

    async fn insert(&self, bracket: Bracket) -> Result<BracketDocument> {
        match self.documents.entry(bracket.id.clone()) {
            Entry::Occupied(_) => Err(SlotError::Internal {
                message: format!("bracket id {} already exists", bracket.id),
            }),
            Entry::Vacant(vacant) => {
                let doc = BracketDocument {
                    version: 1,
                    bracket,
                };
                vacant.insert(doc.clone());
                Ok(doc)
            }
        }
    }

    async fn remove(&self, bracket_id: &str) -> Result<()> {
        self.documents
            .remove(bracket_id)
            .map(|_| ())
            .ok_or_else(|| SlotError::NotFound {
                bracket_id: bracket_id.to_string(),
            })
    }

    async fn list(&self, filter: &BracketFilter) -> Result<Vec<BracketDocument>> {
        Ok(self
            .documents
            .iter()
            .filter(|doc| filter.matches(&doc.bracket))
            .map(|doc| doc.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NewBracket, Visibility};

    fn bracket(creator: &str, visibility: Visibility) -> Bracket {
        NewBracket {
            name: "Test".to_string(),
            platform: "twitch".to_string(),
            visibility,
            slot_count: 2,
            first_start: chrono::Utc::now(),
            interval_minutes: 30,
        }
        .into_bracket(creator)
        .unwrap()
    }

    #[tokio::test]
    async fn test_compare_and_set_bumps_version() {
        let store = MemoryDocumentStore::new();
        let doc = store.insert(bracket("Host", Visibility::Public)).await.unwrap();
        assert_eq!(doc.version, 1);

        let mut changed = doc.bracket.clone();
        changed.name = "Renamed".to_string();
        let version = store.compare_and_set(&changed.id.clone(), 1, changed).await.unwrap();
        assert_eq!(version, 2);

        let stored = store.get(&doc.bracket.id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.bracket.name, "Renamed");
    }

    #[tokio::test]
    async fn test_stale_write_rejected() {
        let store = MemoryDocumentStore::new();
        let doc = store.insert(bracket("Host", Visibility::Public)).await.unwrap();
        let id = doc.bracket.id.clone();

        store.compare_and_set(&id, 1, doc.bracket.clone()).await.unwrap();
        let err = store
            .compare_and_set(&id, 1, doc.bracket.clone())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SlotError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_bracket() {
        let store = MemoryDocumentStore::new();
        let b = bracket("Host", Visibility::Public);

        assert!(matches!(
            store.get("nope").await,
            Err(SlotError::NotFound { .. })
        ));
        assert!(matches!(
            store.compare_and_set("nope", 1, b).await,
            Err(SlotError::NotFound { .. })
        ));
        assert!(matches!(
            store.remove("nope").await,
            Err(SlotError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = MemoryDocumentStore::new();
        store.insert(bracket("Host", Visibility::Public)).await.unwrap();
        store.insert(bracket("Host", Visibility::Private)).await.unwrap();
        store.insert(bracket("Other", Visibility::Public)).await.unwrap();

        let public = store
            .list(&BracketFilter {
                creator: None,
                visibility: Some(Visibility::Public),
            })
            .await
            .unwrap();
        assert_eq!(public.len(), 2);

        let hosts = store
            .list(&BracketFilter {
                creator: Some("Host".to_string()),
                visibility: None,
            })
            .await
            .unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(store.len(), 3);
    }
}
