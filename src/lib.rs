// todostore - Todo list store with pending/completed views and durable key-value persistence

pub mod backend;
pub mod config;
pub mod dnd;
pub mod filter;
pub mod jsonl;
pub mod models;
pub mod snapshot;
pub mod store;

// Re-export main types for convenience
pub use backend::{BackendKind, FileBackend, MemoryBackend, SqliteBackend, StorageBackend};
pub use config::Config;
pub use dnd::{Column, handle_drop};
pub use filter::{Filter, View};
pub use models::{Task, TaskId, TaskPatch};
pub use store::{DEFAULT_STORAGE_KEY, TaskStore};
