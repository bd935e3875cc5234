//! Persistent state: agent settings and the inventory store.

pub mod props;
pub mod settings;
pub mod store;

pub use store::{InventoryStore, STATE_FILE};
