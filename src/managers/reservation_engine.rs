//! Seat reservation and confirmation for bracket slots.
//!
//! Every operation plans the next slot sequence from a loaded snapshot
//! without touching the store, then persists it with a single
//! compare-and-set against the snapshot's version. A writer holding a stale
//! snapshot gets `VersionConflict`; it reloads and re-evaluates.

use std::fmt;
use tracing::{debug, info};

use crate::error::{Result, SlotError};
use crate::state::{Seat, Slot};
use crate::store::{SharedBracketSlotStore, SlotSnapshot};

/// An intended change to one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    Join(Seat),
    Confirm,
    Leave,
    Decline,
}

impl fmt::Display for SlotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotAction::Join(seat) => write!(f, "join seat {}", seat),
            SlotAction::Confirm => write!(f, "confirm"),
            SlotAction::Leave => write!(f, "leave"),
            SlotAction::Decline => write!(f, "decline"),
        }
    }
}

/// Compute the sequence after `label` performs `action` on `slot_id`
pub fn plan(
    snapshot: &SlotSnapshot,
    slot_id: &str,
    action: SlotAction,
    label: &str,
) -> Result<Vec<Slot>> {
    validate_label(label)?;

    let mut slots = snapshot.slots.clone();
    let slot = slots
        .iter_mut()
        .find(|slot| slot.id == slot_id)
        .ok_or_else(|| SlotError::SlotNotFound {
            bracket_id: snapshot.bracket_id.clone(),
            slot_id: slot_id.to_string(),
        })?;

    match action {
        SlotAction::Join(seat) => slot.join(seat, label)?,
        SlotAction::Confirm => slot.confirm(label)?,
        SlotAction::Leave => slot.vacate(label)?,
        SlotAction::Decline => slot.decline(label)?,
    }

    Ok(slots)
}

fn validate_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(SlotError::InvalidRequest {
            message: "participant label must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Validates slot actions and persists their outcome.
///
/// Holds no state of its own besides the injected store; independent
/// clients each use their own engine.
pub struct SlotReservationEngine {
    store: SharedBracketSlotStore,
}

impl SlotReservationEngine {
    pub fn new(store: SharedBracketSlotStore) -> Self {
        Self { store }
    }

    /// Load the freshest snapshot of a bracket's slots
    pub async fn load(&self, bracket_id: &str) -> Result<SlotSnapshot> {
        self.store.load_slots(bracket_id).await
    }

    /// Take an empty seat
    pub async fn join(
        &self,
        snapshot: &SlotSnapshot,
        slot_id: &str,
        seat: Seat,
        label: &str,
    ) -> Result<SlotSnapshot> {
        self.apply(snapshot, slot_id, SlotAction::Join(seat), label).await
    }

    /// Confirm the seat(s) held by `label`
    pub async fn confirm(
        &self,
        snapshot: &SlotSnapshot,
        slot_id: &str,
        label: &str,
    ) -> Result<SlotSnapshot> {
        self.apply(snapshot, slot_id, SlotAction::Confirm, label).await
    }

    pub async fn leave(
        &self,
        snapshot: &SlotSnapshot,
        slot_id: &str,
        label: &str,
    ) -> Result<SlotSnapshot> {
        self.apply(snapshot, slot_id, SlotAction::Leave, label).await
    }

    pub async fn decline(
        &self,
        snapshot: &SlotSnapshot,
        slot_id: &str,
        label: &str,
    ) -> Result<SlotSnapshot> {
        self.apply(snapshot, slot_id, SlotAction::Decline, label).await
    }

    /// Whether the UI should offer `label` a confirm action on the slot
    pub fn can_confirm(&self, snapshot: &SlotSnapshot, slot_id: &str, label: &str) -> bool {
        snapshot
            .slot(slot_id)
            .map(|slot| slot.can_confirm(label))
            .unwrap_or(false)
    }

    /// Plan `action` against `snapshot` and persist it in one conditional write.
    ///
    /// A plan that changes nothing is not written.
    pub async fn apply(
        &self,
        snapshot: &SlotSnapshot,
        slot_id: &str,
        action: SlotAction,
        label: &str,
    ) -> Result<SlotSnapshot> {
        let slots = plan(snapshot, slot_id, action, label)?;

        if slots == snapshot.slots {
            debug!(
                "'{}' {} on slot {} changed nothing",
                label, action, slot_id
            );
            return Ok(snapshot.clone());
        }

        let next = self
            .store
            .replace_slots(&snapshot.bracket_id, snapshot.version, slots)
            .await?;

        info!(
            "'{}' {} on slot {} of bracket {} (version {})",
            label, action, slot_id, snapshot.bracket_id, next.version
        );
        Ok(next)
    }
}
