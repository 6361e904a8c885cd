pub mod bracket;
pub mod slot;

pub use bracket::{
    Bracket, BracketDocument, BracketFilter, NewBracket, Visibility, MAX_INTERVAL_MINUTES, MAX_SLOTS,
};
pub use slot::{derive_status, Seat, Slot, SlotStatus};
