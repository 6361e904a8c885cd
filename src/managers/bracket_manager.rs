use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Result, SlotError};
use crate::feed::{SharedSlotFeed, SlotEvent, SlotEventKind};
use crate::identity::IdentityProvider;
use crate::state::{BracketDocument, BracketFilter, NewBracket, Visibility};
use crate::store::SharedDocumentStore;

/// Creates, lists and deletes brackets
pub struct BracketManager {
    documents: SharedDocumentStore,
    feed: SharedSlotFeed,
}

impl BracketManager {
    pub fn new(documents: SharedDocumentStore, feed: SharedSlotFeed) -> Self {
        Self { documents, feed }
    }

    /// Create a bracket owned by the current user, all slots open
    pub async fn create_bracket(
        &self,
        request: NewBracket,
        identity: &dyn IdentityProvider,
    ) -> Result<BracketDocument> {
        let creator = identity.current_user_label();
        let bracket = request.into_bracket(&creator)?;
        let doc = self.documents.insert(bracket).await?;

        info!(
            "'{}' created bracket '{}' ({}) with {} slots",
            creator,
            doc.bracket.name,
            doc.bracket.id,
            doc.bracket.slots.len()
        );
        self.feed.publish(SlotEvent::bracket(
            &doc.bracket.id,
            doc.version,
            SlotEventKind::BracketCreated,
        ));
        Ok(doc)
    }

    pub async fn get_bracket(&self, bracket_id: &str) -> Result<BracketDocument> {
        let mut doc = self.documents.get(bracket_id).await?;
        doc.bracket.refresh_statuses();
        Ok(doc)
    }

    /// Public brackets plus the caller's private ones, oldest first
    pub async fn list_visible(&self, identity: &dyn IdentityProvider) -> Result<Vec<BracketDocument>> {
        let label = identity.current_user_label();

        let mut docs = self
            .documents
            .list(&BracketFilter {
                creator: None,
                visibility: Some(Visibility::Public),
            })
            .await?;
        let own_private = self
            .documents
            .list(&BracketFilter {
                creator: Some(label),
                visibility: Some(Visibility::Private),
            })
            .await?;
        docs.extend(own_private);

        for doc in &mut docs {
            doc.bracket.refresh_statuses();
        }
        docs.sort_by(|a, b| {
            a.bracket
                .created_at
                .cmp(&b.bracket.created_at)
                .then_with(|| a.bracket.id.cmp(&b.bracket.id))
        });
        Ok(docs)
    }

    /// Delete a bracket; only its creator may
    pub async fn delete_bracket(&self, bracket_id: &str, identity: &dyn IdentityProvider) -> Result<()> {
        let label = identity.current_user_label();
        let doc = self.documents.get(bracket_id).await?;

        if doc.bracket.creator != label {
            warn!(
                "'{}' tried to delete bracket {} owned by '{}'",
                label, bracket_id, doc.bracket.creator
            );
            return Err(SlotError::PermissionDenied {
                message: "only the creator can delete a bracket".to_string(),
            });
        }

        self.documents.remove(bracket_id).await?;
        info!("'{}' deleted bracket {}", label, bracket_id);
        self.feed.publish(SlotEvent::bracket(
            bracket_id,
            doc.version,
            SlotEventKind::BracketDeleted,
        ));
        Ok(())
    }
}

/// Shared bracket manager type
pub type SharedBracketManager = Arc<BracketManager>;

pub fn create_shared_bracket_manager(
    documents: SharedDocumentStore,
    feed: SharedSlotFeed,
) -> SharedBracketManager {
    Arc::new(BracketManager::new(documents, feed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::create_slot_feed;
    use crate::identity::StaticIdentity;
    use crate::store::MemoryDocumentStore;

    fn manager() -> BracketManager {
        BracketManager::new(Arc::new(MemoryDocumentStore::new()), create_slot_feed(20))
    }

    fn request(name: &str, visibility: Visibility) -> NewBracket {
        NewBracket {
            name: name.to_string(),
            platform: "tiktok".to_string(),
            visibility,
            slot_count: 4,
            first_start: chrono::Utc::now(),
            interval_minutes: 10,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let manager = manager();
        let host = StaticIdentity("Host".to_string());

        let doc = manager
            .create_bracket(request("Showdown", Visibility::Public), &host)
            .await
            .unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.bracket.creator, "Host");

        let fetched = manager.get_bracket(&doc.bracket.id).await.unwrap();
        assert_eq!(fetched, doc);
        assert_eq!(manager.feed.recent_for(&doc.bracket.id, 5).len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_not_stored() {
        let manager = manager();
        let host = StaticIdentity("Host".to_string());

        let mut bad = request("Empty", Visibility::Public);
        bad.slot_count = 0;
        assert!(matches!(
            manager.create_bracket(bad, &host).await,
            Err(SlotError::InvalidRequest { .. })
        ));
        assert!(manager.list_visible(&host).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_private_brackets_visible_to_creator_only() {
        let manager = manager();
        let host = StaticIdentity("Host".to_string());
        let guest = StaticIdentity("Guest".to_string());

        manager
            .create_bracket(request("Open Night", Visibility::Public), &host)
            .await
            .unwrap();
        manager
            .create_bracket(request("Invite Only", Visibility::Private), &host)
            .await
            .unwrap();

        assert_eq!(manager.list_visible(&host).await.unwrap().len(), 2);
        let seen_by_guest = manager.list_visible(&guest).await.unwrap();
        assert_eq!(seen_by_guest.len(), 1);
        assert_eq!(seen_by_guest[0].bracket.name, "Open Night");
    }

    #[tokio::test]
    async fn test_only_creator_deletes() {
        let manager = manager();
        let host = StaticIdentity("Host".to_string());
        let guest = StaticIdentity("Guest".to_string());

        let doc = manager
            .create_bracket(request("Mine", Visibility::Public), &host)
            .await
            .unwrap();
        let id = doc.bracket.id.clone();

        assert!(matches!(
            manager.delete_bracket(&id, &guest).await,
            Err(SlotError::PermissionDenied { .. })
        ));
        manager.delete_bracket(&id, &host).await.unwrap();
        assert!(matches!(
            manager.get_bracket(&id).await,
            Err(SlotError::NotFound { .. })
        ));
    }
}
