use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::document::SharedDocumentStore;
use crate::error::{Result, SlotError};
use crate::state::Slot;

/// A bracket's slot sequence as read at one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub bracket_id: String,
    pub version: u64,
    pub slots: Vec<Slot>,
}

impl SlotSnapshot {
    pub fn slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == slot_id)
    }
}

/// Consistent reads and atomic whole-sequence replacement of bracket slots
pub struct BracketSlotStore {
    documents: SharedDocumentStore,
}

impl BracketSlotStore {
    pub fn new(documents: SharedDocumentStore) -> Self {
        Self { documents }
    }

    /// Fetch the current slot sequence with freshly derived statuses
    pub async fn load_slots(&self, bracket_id: &str) -> Result<SlotSnapshot> {
        let mut doc = self.documents.get(bracket_id).await?;
        doc.bracket.refresh_statuses();

        Ok(SlotSnapshot {
            bracket_id: bracket_id.to_string(),
            version: doc.version,
            slots: doc.bracket.slots,
        })
    }

    /// Overwrite the whole slot sequence if nobody wrote since `expected_version`.
    ///
    /// The new sequence must keep every slot id in its original position.
    pub async fn replace_slots(
        &self,
        bracket_id: &str,
        expected_version: u64,
        mut slots: Vec<Slot>,
    ) -> Result<SlotSnapshot> {
        let doc = self.documents.get(bracket_id).await?;
        if doc.version != expected_version {
            return Err(SlotError::VersionConflict {
                bracket_id: bracket_id.to_string(),
                expected: expected_version,
                actual: doc.version,
            });
        }

        let same_layout = doc.bracket.slots.len() == slots.len()
            && doc
                .bracket
                .slots
                .iter()
                .zip(&slots)
                .all(|(old, new)| old.id == new.id);
        if !same_layout {
            warn!("Rejected slot rewrite of bracket {} with a different layout", bracket_id);
            return Err(SlotError::InvalidRequest {
                message: "slot ids and order cannot change".to_string(),
            });
        }

        for slot in &mut slots {
            slot.refresh_status();
        }

        let mut bracket = doc.bracket;
        bracket.slots = slots.clone();
        let version = self
            .documents
            .compare_and_set(bracket_id, expected_version, bracket)
            .await?;

        debug!(
            "Replaced slots of bracket {} (version {} -> {})",
            bracket_id, expected_version, version
        );

        Ok(SlotSnapshot {
            bracket_id: bracket_id.to_string(),
            version,
            slots,
        })
    }
}

/// Shared slot store type
pub type SharedBracketSlotStore = Arc<BracketSlotStore>;

pub fn create_shared_slot_store(documents: SharedDocumentStore) -> SharedBracketSlotStore {
    Arc::new(BracketSlotStore::new(documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NewBracket, Seat, SlotStatus, Visibility};
    use crate::store::{DocumentStore, MemoryDocumentStore};

    async fn setup() -> (BracketSlotStore, String) {
        let documents = Arc::new(MemoryDocumentStore::new());
        let bracket = NewBracket {
            name: "Test".to_string(),
            platform: "tiktok".to_string(),
            visibility: Visibility::Public,
            slot_count: 2,
            first_start: chrono::Utc::now(),
            interval_minutes: 30,
        }
        .into_bracket("Host")
        .unwrap();
        let id = bracket.id.clone();
        documents.insert(bracket).await.unwrap();
        (BracketSlotStore::new(documents), id)
    }

    #[tokio::test]
    async fn test_load_recomputes_stale_status() {
        let documents = Arc::new(MemoryDocumentStore::new());
        let mut bracket = NewBracket {
            name: "Stale".to_string(),
            platform: "tiktok".to_string(),
            visibility: Visibility::Public,
            slot_count: 1,
            first_start: chrono::Utc::now(),
            interval_minutes: 0,
        }
        .into_bracket("Host")
        .unwrap();
        bracket.slots[0].seat_a = "Alice".to_string();
        bracket.slots[0].status = SlotStatus::Confirmed;
        let id = bracket.id.clone();
        documents.insert(bracket).await.unwrap();

        let store = BracketSlotStore::new(documents);
        let snapshot = store.load_slots(&id).await.unwrap();
        assert_eq!(snapshot.slots[0].status, SlotStatus::Pending);
    }

    #[tokio::test]
    async fn test_replace_slots_is_visible_to_next_reader() {
        let (store, id) = setup().await;
        let snapshot = store.load_slots(&id).await.unwrap();

        let mut slots = snapshot.slots.clone();
        slots[1].join(Seat::B, "Bob").unwrap();
        let written = store.replace_slots(&id, snapshot.version, slots).await.unwrap();
        assert_eq!(written.version, snapshot.version + 1);

        let reread = store.load_slots(&id).await.unwrap();
        assert_eq!(reread, written);
        assert_eq!(reread.slots[1].occupant(Seat::B), Some("Bob"));
    }

    #[tokio::test]
    async fn test_replace_slots_with_stale_version() {
        let (store, id) = setup().await;
        let snapshot = store.load_slots(&id).await.unwrap();
        store
            .replace_slots(&id, snapshot.version, snapshot.slots.clone())
            .await
            .unwrap();

        let err = store
            .replace_slots(&id, snapshot.version, snapshot.slots.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, SlotError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn test_replace_slots_rejects_reordering() {
        let (store, id) = setup().await;
        let snapshot = store.load_slots(&id).await.unwrap();

        let mut slots = snapshot.slots.clone();
        slots.reverse();
        let err = store
            .replace_slots(&id, snapshot.version, slots)
            .await
            .unwrap_err();
        assert!(matches!(err, SlotError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_unknown_bracket() {
        let (store, _) = setup().await;
        assert!(matches!(
            store.load_slots("missing").await,
            Err(SlotError::NotFound { .. })
        ));
        assert!(matches!(
            store.replace_slots("missing", 1, vec![]).await,
            Err(SlotError::NotFound { .. })
        ));
    }
}
