//! Durable chat history for the Ontime client.
//!
//! The whole transcript is stored as one serialized snapshot under a fixed
//! key. Every save overwrites the previous snapshot.

pub mod db;
pub mod error;
pub mod history;
pub mod migrations;

pub use db::Database;
pub use error::StorageError;
pub use history::{HistoryStore, MemoryHistoryStore, SqliteHistoryStore};
