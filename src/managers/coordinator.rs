use std::sync::Arc;
use tracing::{info, warn};

use super::reservation_engine::{SlotAction, SlotReservationEngine};
use crate::error::Result;
use crate::feed::{SharedSlotFeed, SlotEvent, SlotEventKind};
use crate::identity::IdentityProvider;
use crate::store::SlotSnapshot;

/// Drives slot actions on behalf of clients.
///
/// Always starts from a freshly loaded snapshot. When another writer got in
/// between load and write, the action is re-evaluated against the new state
/// up to `max_conflict_retries` times; every other error is returned as is.
pub struct ReservationCoordinator {
    engine: SlotReservationEngine,
    feed: SharedSlotFeed,
    max_conflict_retries: u32,
}

impl ReservationCoordinator {
    pub fn new(engine: SlotReservationEngine, feed: SharedSlotFeed, max_conflict_retries: u32) -> Self {
        Self {
            engine,
            feed,
            max_conflict_retries,
        }
    }

    /// Current slots of a bracket
    pub async fn snapshot(&self, bracket_id: &str) -> Result<SlotSnapshot> {
        self.engine.load(bracket_id).await
    }

    /// Perform `action` on a slot as the current user
    pub async fn perform(
        &self,
        bracket_id: &str,
        slot_id: &str,
        action: SlotAction,
        identity: &dyn IdentityProvider,
    ) -> Result<SlotSnapshot> {
        let label = identity.current_user_label();
        let mut attempt = 0;

        loop {
            let snapshot = self.engine.load(bracket_id).await?;

            match self.engine.apply(&snapshot, slot_id, action, &label).await {
                Ok(next) => {
                    if next.version != snapshot.version {
                        self.publish(&next, slot_id, action, &label);
                    }
                    return Ok(next);
                }
                Err(e) if e.is_retryable() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    warn!(
                        "Conflict on bracket {} while '{}' tried {} (retry {}/{})",
                        bracket_id, label, action, attempt, self.max_conflict_retries
                    );
                }
                Err(e) => {
                    info!("'{}' could not {} on slot {}: {}", label, action, slot_id, e);
                    return Err(e);
                }
            }
        }
    }

    fn publish(&self, snapshot: &SlotSnapshot, slot_id: &str, action: SlotAction, label: &str) {
        let Some(slot) = snapshot.slot(slot_id) else {
            return;
        };

        let label = label.to_string();
        let kind = match action {
            SlotAction::Join(seat) => SlotEventKind::SeatJoined { seat, label },
            SlotAction::Confirm => SlotEventKind::SeatConfirmed { label },
            SlotAction::Leave => SlotEventKind::SeatLeft { label },
            SlotAction::Decline => SlotEventKind::SlotDeclined { label },
        };

        self.feed.publish(SlotEvent::slot(
            &snapshot.bracket_id,
            slot_id,
            snapshot.version,
            slot.status,
            kind,
        ));
    }
}

/// Shared coordinator type
pub type SharedReservationCoordinator = Arc<ReservationCoordinator>;

pub fn create_shared_coordinator(
    engine: SlotReservationEngine,
    feed: SharedSlotFeed,
    max_conflict_retries: u32,
) -> SharedReservationCoordinator {
    Arc::new(ReservationCoordinator::new(engine, feed, max_conflict_retries))
}
