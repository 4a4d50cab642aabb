mod interface;
mod json_store;
mod memory_store;

pub use interface::{Accounts, BackendError, Result, SnapshotStore};
pub use json_store::JsonStore;
pub use memory_store::MemoryStore;
