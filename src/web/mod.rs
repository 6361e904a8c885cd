//! HTTP surface for bracket clients
//!
//! Clients list and create brackets, read slot snapshots, perform slot
//! actions and follow live changes over SSE.

mod error;
mod routes;
mod server;

pub use routes::{AppState, JoinRequest, SlotView, SlotsResponse};
pub use server::{router, start_web_server};
