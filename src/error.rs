use thiserror::Error;

use crate::state::{Seat, SlotStatus};

#[derive(Error, Debug)]
pub enum SlotError {
    // Lookup errors
    #[error("Bracket not found: {bracket_id}")]
    NotFound { bracket_id: String },

    #[error("Slot '{slot_id}' not found in bracket {bracket_id}")]
    SlotNotFound { bracket_id: String, slot_id: String },

    // Reservation errors
    #[error("Seat {seat} of slot '{slot_id}' is already taken")]
    SeatOccupied { slot_id: String, seat: Seat },

    #[error("'{label}' does not occupy a seat in slot '{slot_id}'")]
    NotAParticipant { slot_id: String, label: String },

    #[error("'{label}' already holds the other seat of slot '{slot_id}'")]
    SelfMatchNotAllowed { slot_id: String, label: String },

    #[error("Slot '{slot_id}' is {status} and can no longer change")]
    SlotClosed { slot_id: String, status: SlotStatus },

    // Persistence errors
    #[error("Bracket {bracket_id} was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        bracket_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to write bracket {bracket_id}: {message}")]
    WriteConflict { bracket_id: String, message: String },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse state file '{path}': {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // Request errors
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("No user identity supplied")]
    Unidentified,

    // Configuration errors
    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SlotError {
    /// Whether reloading fresh state and repeating the same intent can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SlotError::VersionConflict { .. })
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            SlotError::NotFound { .. } => "not_found",
            SlotError::SlotNotFound { .. } => "slot_not_found",
            SlotError::SeatOccupied { .. } => "seat_occupied",
            SlotError::NotAParticipant { .. } => "not_a_participant",
            SlotError::SelfMatchNotAllowed { .. } => "self_match_not_allowed",
            SlotError::SlotClosed { .. } => "slot_closed",
            SlotError::VersionConflict { .. } => "version_conflict",
            SlotError::WriteConflict { .. } => "write_conflict",
            SlotError::StateLoad { .. } | SlotError::StateParse { .. } => "state_error",
            SlotError::InvalidRequest { .. } => "invalid_request",
            SlotError::PermissionDenied { .. } => "permission_denied",
            SlotError::Unidentified => "unidentified",
            SlotError::ConfigValidation { .. } => "config_invalid",
            SlotError::Internal { .. } => "internal",
        }
    }
}

impl From<std::io::Error> for SlotError {
    fn from(err: std::io::Error) -> Self {
        SlotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SlotError {
    fn from(err: serde_json::Error) -> Self {
        SlotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SlotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_version_conflicts_are_retryable() {
        let conflict = SlotError::VersionConflict {
            bracket_id: "b".to_string(),
            expected: 1,
            actual: 2,
        };
        assert!(conflict.is_retryable());

        let write = SlotError::WriteConflict {
            bracket_id: "b".to_string(),
            message: "disk full".to_string(),
        };
        assert!(!write.is_retryable());

        let occupied = SlotError::SeatOccupied {
            slot_id: "s".to_string(),
            seat: Seat::A,
        };
        assert!(!occupied.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = SlotError::SeatOccupied {
            slot_id: "s1".to_string(),
            seat: Seat::B,
        };
        assert_eq!(err.to_string(), "Seat B of slot 's1' is already taken");
        assert_eq!(err.kind(), "seat_occupied");
    }
}
