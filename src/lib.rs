//! Slot reservation for creator-vs-creator match brackets.
//!
//! Two users each claim one seat of a scheduled slot and both confirm it.
//! Slot sequences are rewritten whole with an optimistic version check, so
//! concurrent clients never silently overwrite each other.

pub mod config;
pub mod error;
pub mod feed;
pub mod identity;
pub mod managers;
pub mod state;
pub mod store;
pub mod web;

pub use error::{Result, SlotError};
