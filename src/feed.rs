//! Live feed of committed bracket changes.
//!
//! Keeps a bounded history of recent events and broadcasts new ones so
//! clients can reload a bracket as soon as someone else changes it.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::state::{Seat, SlotStatus};

/// What happened to a bracket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotEventKind {
    BracketCreated,
    BracketDeleted,
    SeatJoined { seat: Seat, label: String },
    SeatConfirmed { label: String },
    SeatLeft { label: String },
    SlotDeclined { label: String },
}

/// A single committed change
#[derive(Debug, Clone, Serialize)]
pub struct SlotEvent {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub bracket_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    /// Bracket version after the change
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SlotStatus>,
    #[serde(flatten)]
    pub kind: SlotEventKind,
}

impl SlotEvent {
    pub fn bracket(bracket_id: &str, version: u64, kind: SlotEventKind) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            bracket_id: bracket_id.to_string(),
            slot_id: None,
            version,
            status: None,
            kind,
        }
    }

    pub fn slot(
        bracket_id: &str,
        slot_id: &str,
        version: u64,
        status: SlotStatus,
        kind: SlotEventKind,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            bracket_id: bracket_id.to_string(),
            slot_id: Some(slot_id.to_string()),
            version,
            status: Some(status),
            kind,
        }
    }

    /// Format as JSON for SSE
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Recent events plus a broadcast channel for new ones
pub struct SlotFeed {
    tx: broadcast::Sender<SlotEvent>,
    recent: parking_lot::RwLock<VecDeque<SlotEvent>>,
    max_entries: usize,
}

impl SlotFeed {
    pub fn new(max_entries: usize) -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self {
            tx,
            recent: parking_lot::RwLock::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    pub fn publish(&self, event: SlotEvent) {
        {
            let mut recent = self.recent.write();
            if recent.len() >= self.max_entries {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }

        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Up to `count` most recent events for a bracket, oldest first
    pub fn recent_for(&self, bracket_id: &str, count: usize) -> Vec<SlotEvent> {
        let recent = self.recent.read();
        let mut events: Vec<SlotEvent> = recent
            .iter()
            .rev()
            .filter(|e| e.bracket_id == bracket_id)
            .take(count)
            .cloned()
            .collect();
        events.reverse();
        events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SlotEvent> {
        self.tx.subscribe()
    }
}

/// Shared feed type
pub type SharedSlotFeed = Arc<SlotFeed>;

pub fn create_slot_feed(max_entries: usize) -> SharedSlotFeed {
    Arc::new(SlotFeed::new(max_entries))
}
