use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::slot::Slot;
use crate::error::{Result, SlotError};

/// Most slots a single bracket may schedule
pub const MAX_SLOTS: usize = 64;

/// Longest gap between consecutive slots (one week)
pub const MAX_INTERVAL_MINUTES: i64 = 7 * 24 * 60;

/// Whether a bracket shows up for everyone or only its creator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// A named collection of slots for one streaming platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub id: String,
    pub name: String,

    /// Label of the creator who owns the bracket
    pub creator: String,

    /// Streaming platform the matches are played on
    pub platform: String,

    #[serde(default)]
    pub visibility: Visibility,

    /// Ordered; positions are meaningful to participants
    pub slots: Vec<Slot>,

    pub created_at: DateTime<Utc>,
}

impl Bracket {
    /// Recompute the status of every slot
    pub fn refresh_statuses(&mut self) {
        for slot in &mut self.slots {
            slot.refresh_status();
        }
    }

    pub fn is_visible_to(&self, label: &str) -> bool {
        self.visibility == Visibility::Public || self.creator == label
    }
}

/// A bracket as held by the document store, with its write version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketDocument {
    /// Incremented by one on every successful write
    pub version: u64,
    pub bracket: Bracket,
}

/// Request to create a bracket with evenly spaced slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBracket {
    pub name: String,
    pub platform: String,

    #[serde(default)]
    pub visibility: Visibility,

    pub slot_count: usize,

    /// Start of the first slot
    pub first_start: DateTime<Utc>,

    /// Minutes between consecutive slots
    #[serde(default = "default_interval")]
    pub interval_minutes: i64,
}

fn default_interval() -> i64 {
    30
}

impl NewBracket {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SlotError::InvalidRequest {
                message: "bracket name must not be empty".to_string(),
            });
        }
        if self.platform.trim().is_empty() {
            return Err(SlotError::InvalidRequest {
                message: "platform must not be empty".to_string(),
            });
        }
        if self.slot_count == 0 || self.slot_count > MAX_SLOTS {
            return Err(SlotError::InvalidRequest {
                message: format!("slot count must be between 1 and {}", MAX_SLOTS),
            });
        }
        if !(0..=MAX_INTERVAL_MINUTES).contains(&self.interval_minutes) {
            return Err(SlotError::InvalidRequest {
                message: format!(
                    "slot interval must be between 0 and {} minutes",
                    MAX_INTERVAL_MINUTES
                ),
            });
        }
        Ok(())
    }

    /// Build the bracket with fresh ids and every slot open
    pub fn into_bracket(self, creator: &str) -> Result<Bracket> {
        self.validate()?;

        let slots = (0..self.slot_count)
            .map(|k| {
                let start = self.first_start + Duration::minutes(self.interval_minutes * k as i64);
                Slot::new(uuid::Uuid::new_v4().to_string(), start)
            })
            .collect();

        Ok(Bracket {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            creator: creator.to_string(),
            platform: self.platform.trim().to_string(),
            visibility: self.visibility,
            slots,
            created_at: Utc::now(),
        })
    }
}

/// Field filter for bracket queries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BracketFilter {
    pub creator: Option<String>,
    pub visibility: Option<Visibility>,
}

impl BracketFilter {
    pub fn matches(&self, bracket: &Bracket) -> bool {
        self.creator
            .as_deref()
            .map_or(true, |creator| bracket.creator == creator)
            && self
                .visibility
                .map_or(true, |visibility| bracket.visibility == visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SlotStatus;

    fn request(slot_count: usize) -> NewBracket {
        NewBracket {
            name: "Friday Night Fill-In".to_string(),
            platform: "tiktok".to_string(),
            visibility: Visibility::Public,
            slot_count,
            first_start: "2025-05-02T20:00:00Z".parse().unwrap(),
            interval_minutes: 15,
        }
    }

    #[test]
    fn test_new_bracket_spaces_slots() {
        let bracket = request(3).into_bracket("Host").unwrap();

        assert_eq!(bracket.creator, "Host");
        assert_eq!(bracket.slots.len(), 3);
        let gap = bracket.slots[2].scheduled_start - bracket.slots[1].scheduled_start;
        assert_eq!(gap, Duration::minutes(15));
        assert!(bracket.slots.iter().all(|s| s.status == SlotStatus::Open));

        let ids: std::collections::HashSet<_> = bracket.slots.iter().map(|s| &s.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_new_bracket_validation() {
        assert!(request(0).validate().is_err());
        assert!(request(MAX_SLOTS + 1).validate().is_err());

        let mut too_sparse = request(2);
        too_sparse.interval_minutes = MAX_INTERVAL_MINUTES + 1;
        assert!(too_sparse.validate().is_err());

        let mut unnamed = request(2);
        unnamed.name = "   ".to_string();
        assert!(matches!(
            unnamed.validate(),
            Err(SlotError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_filter_and_visibility() {
        let mut bracket = request(1).into_bracket("Host").unwrap();
        bracket.visibility = Visibility::Private;

        assert!(bracket.is_visible_to("Host"));
        assert!(!bracket.is_visible_to("Guest"));

        let by_creator = BracketFilter {
            creator: Some("Host".to_string()),
            visibility: None,
        };
        assert!(by_creator.matches(&bracket));

        let public_only = BracketFilter {
            creator: None,
            visibility: Some(Visibility::Public),
        };
        assert!(!public_only.matches(&bracket));
    }
}
