pub mod bracket_manager;
pub mod coordinator;
pub mod reservation_engine;

pub use bracket_manager::{create_shared_bracket_manager, BracketManager, SharedBracketManager};
pub use coordinator::{
    create_shared_coordinator, ReservationCoordinator, SharedReservationCoordinator,
};
pub use reservation_engine::{plan, SlotAction, SlotReservationEngine};
