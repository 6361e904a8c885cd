pub mod document;
pub mod json_file;
pub mod memory;
pub mod slot_store;

pub use document::{DocumentStore, SharedDocumentStore};
pub use json_file::JsonFileDocumentStore;
pub use memory::MemoryDocumentStore;
pub use slot_store::{
    create_shared_slot_store, BracketSlotStore, SharedBracketSlotStore, SlotSnapshot,
};
