use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SlotError};

/// One of the two participant positions in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    A,
    B,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::A => write!(f, "A"),
            Seat::B => write!(f, "B"),
        }
    }
}

/// Display status of a slot, always derived from its seats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Open,
    Pending,
    Confirmed,
    Declined,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotStatus::Open => "open",
            SlotStatus::Pending => "pending",
            SlotStatus::Confirmed => "confirmed",
            SlotStatus::Declined => "declined",
        };
        f.write_str(name)
    }
}

/// Compute the status of an undeclined slot from its seat fields.
///
/// A confirmed flag only counts while its seat is occupied.
pub fn derive_status(
    seat_a: &str,
    seat_a_confirmed: bool,
    seat_b: &str,
    seat_b_confirmed: bool,
) -> SlotStatus {
    let a_filled = !seat_a.is_empty();
    let b_filled = !seat_b.is_empty();

    match (a_filled, b_filled) {
        (false, false) => SlotStatus::Open,
        (true, true) if seat_a_confirmed && seat_b_confirmed => SlotStatus::Confirmed,
        _ => SlotStatus::Pending,
    }
}

/// One scheduled match opportunity within a bracket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Unique within the bracket, never reassigned
    pub id: String,

    /// Occupant label of seat A, empty when unfilled
    #[serde(default)]
    pub seat_a: String,

    #[serde(default)]
    pub seat_a_confirmed: bool,

    /// Occupant label of seat B, empty when unfilled
    #[serde(default)]
    pub seat_b: String,

    #[serde(default)]
    pub seat_b_confirmed: bool,

    /// Proposed match time
    pub scheduled_start: DateTime<Utc>,

    /// Set once a participant declines; terminal
    #[serde(default)]
    pub declined: bool,

    /// Persisted for display, recomputed after every mutation
    pub status: SlotStatus,
}

impl Slot {
    /// Create an empty slot
    pub fn new(id: String, scheduled_start: DateTime<Utc>) -> Self {
        Self {
            id,
            seat_a: String::new(),
            seat_a_confirmed: false,
            seat_b: String::new(),
            seat_b_confirmed: false,
            scheduled_start,
            declined: false,
            status: SlotStatus::Open,
        }
    }

    pub fn occupant(&self, seat: Seat) -> Option<&str> {
        let label = match seat {
            Seat::A => &self.seat_a,
            Seat::B => &self.seat_b,
        };
        (!label.is_empty()).then_some(label.as_str())
    }

    pub fn is_confirmed(&self, seat: Seat) -> bool {
        self.occupant(seat).is_some()
            && match seat {
                Seat::A => self.seat_a_confirmed,
                Seat::B => self.seat_b_confirmed,
            }
    }

    /// Seats currently held by `label`
    pub fn seats_of(&self, label: &str) -> Vec<Seat> {
        [Seat::A, Seat::B]
            .into_iter()
            .filter(|seat| self.occupant(*seat) == Some(label))
            .collect()
    }

    /// Status implied by the seat fields, ignoring the persisted `status`
    pub fn derived_status(&self) -> SlotStatus {
        if self.declined {
            SlotStatus::Declined
        } else {
            derive_status(
                &self.seat_a,
                self.seat_a_confirmed,
                &self.seat_b,
                self.seat_b_confirmed,
            )
        }
    }

    /// Recompute `status` from the seat fields
    pub fn refresh_status(&mut self) {
        self.status = self.derived_status();
    }

    /// Take an empty seat. The joined seat always starts unconfirmed.
    pub fn join(&mut self, seat: Seat, label: &str) -> Result<()> {
        self.ensure_not_declined()?;

        if self.occupant(seat).is_some() {
            return Err(SlotError::SeatOccupied {
                slot_id: self.id.clone(),
                seat,
            });
        }

        if self.occupant(seat.other()) == Some(label) {
            return Err(SlotError::SelfMatchNotAllowed {
                slot_id: self.id.clone(),
                label: label.to_string(),
            });
        }

        self.set_seat(seat, label.to_string(), false);
        self.refresh_status();
        Ok(())
    }

    /// Confirm every seat held by `label`. Confirming twice is a no-op.
    pub fn confirm(&mut self, label: &str) -> Result<()> {
        self.ensure_not_declined()?;
        let seats = self.participant_seats(label)?;

        for seat in seats {
            match seat {
                Seat::A => self.seat_a_confirmed = true,
                Seat::B => self.seat_b_confirmed = true,
            }
        }
        self.refresh_status();
        Ok(())
    }

    /// Whether `label` holds a seat that is still unconfirmed
    pub fn can_confirm(&self, label: &str) -> bool {
        !self.declined
            && self
                .seats_of(label)
                .into_iter()
                .any(|seat| !self.is_confirmed(seat))
    }

    /// Vacate every seat held by `label`
    pub fn vacate(&mut self, label: &str) -> Result<()> {
        self.ensure_pending()?;
        let seats = self.participant_seats(label)?;

        for seat in seats {
            self.set_seat(seat, String::new(), false);
        }
        self.refresh_status();
        Ok(())
    }

    /// Mark the slot declined by one of its participants
    pub fn decline(&mut self, label: &str) -> Result<()> {
        self.ensure_pending()?;
        self.participant_seats(label)?;

        self.declined = true;
        self.refresh_status();
        Ok(())
    }

    fn set_seat(&mut self, seat: Seat, label: String, confirmed: bool) {
        match seat {
            Seat::A => {
                self.seat_a = label;
                self.seat_a_confirmed = confirmed;
            }
            Seat::B => {
                self.seat_b = label;
                self.seat_b_confirmed = confirmed;
            }
        }
    }

    fn participant_seats(&self, label: &str) -> Result<Vec<Seat>> {
        let seats = self.seats_of(label);
        if seats.is_empty() {
            return Err(SlotError::NotAParticipant {
                slot_id: self.id.clone(),
                label: label.to_string(),
            });
        }
        Ok(seats)
    }

    fn ensure_not_declined(&self) -> Result<()> {
        if self.declined {
            return Err(SlotError::SlotClosed {
                slot_id: self.id.clone(),
                status: SlotStatus::Declined,
            });
        }
        Ok(())
    }

    // Leave and decline only apply while the match is still being arranged
    fn ensure_pending(&self) -> Result<()> {
        match self.derived_status() {
            status @ (SlotStatus::Confirmed | SlotStatus::Declined) => {
                Err(SlotError::SlotClosed {
                    slot_id: self.id.clone(),
                    status,
                })
            }
            _ => Ok(()),
        }
    }
}
