//! Persistence layer: chat history and the space access registry.

pub mod access;
pub mod history;

pub use access::{AccessRequest, AccessStore};
pub use history::{HistoryEntry, HistorySink, JsonlHistory, MemoryHistory};
