// Drag-and-drop between the pending and completed columns

use crate::backend::StorageBackend;
use crate::models::{Task, TaskPatch};
use crate::store::TaskStore;
use eyre::{Context, Result};
use tracing::debug;

/// Drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Pending,
    Completed,
}

impl Column {
    /// The `completed` value a task takes when dropped here
    pub fn is_completed(self) -> bool {
        matches!(self, Column::Completed)
    }

    pub fn of(task: &Task) -> Self {
        if task.completed { Column::Completed } else { Column::Pending }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Column::Pending => write!(f, "pending"),
            Column::Completed => write!(f, "completed"),
        }
    }
}

/// Serialize a task as a drag payload
pub fn drag_payload(task: &Task) -> Result<String> {
    serde_json::to_string(task).context("Failed to serialize drag payload")
}

pub fn parse_drag_payload(payload: &str) -> Result<Task> {
    serde_json::from_str(payload).context("Invalid drag payload")
}

/// Handle a drop: the target column decides the task's completed flag.
///
/// Only the id is taken from the payload; the store's copy stays
/// authoritative for every other field. Returns false when the task no
/// longer exists.
pub fn handle_drop<B: StorageBackend>(store: &mut TaskStore<B>, payload: &str, target: Column) -> Result<bool> {
    let dragged = parse_drag_payload(payload)?;

    match store.get(dragged.id) {
        None => return Ok(false),
        Some(current) if Column::of(current) == target => {
            debug!(id = %dragged.id, %target, "Dropped onto its own column");
            return Ok(true);
        }
        Some(_) => {}
    }

    store.update(dragged.id, TaskPatch::default().completed(target.is_completed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn test_payload_round_trip() {
        let mut store = TaskStore::open(MemoryBackend::new());
        let id = store.add("Buy milk", "2%").unwrap();
        let task = store.get(id).unwrap();

        let payload = drag_payload(task).unwrap();
        assert_eq!(&parse_drag_payload(&payload).unwrap(), task);
    }

    #[test]
    fn test_drop_into_completed_and_back() {
        let mut store = TaskStore::open(MemoryBackend::new());
        let id = store.add("Buy milk", "").unwrap();
        let payload = drag_payload(store.get(id).unwrap()).unwrap();

        assert!(handle_drop(&mut store, &payload, Column::Completed).unwrap());
        assert!(store.get(id).unwrap().completed);
        assert_eq!(store.completed().len(), 1);

        // Stale payload still says pending; the target column decides
        assert!(handle_drop(&mut store, &payload, Column::Pending).unwrap());
        assert!(!store.get(id).unwrap().completed);
    }

    #[test]
    fn test_drop_onto_same_column_changes_nothing() {
        let mut store = TaskStore::open(MemoryBackend::new());
        let id = store.add("Buy milk", "").unwrap();
        let before = store.tasks().to_vec();
        let payload = drag_payload(store.get(id).unwrap()).unwrap();

        assert!(handle_drop(&mut store, &payload, Column::Pending).unwrap());
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn test_drop_ignores_payload_fields_other_than_id() {
        let mut store = TaskStore::open(MemoryBackend::new());
        let id = store.add("Buy milk", "").unwrap();
        let mut tampered = store.get(id).unwrap().clone();
        tampered.title = "Something else".to_string();
        let payload = drag_payload(&tampered).unwrap();

        handle_drop(&mut store, &payload, Column::Completed).unwrap();
        assert_eq!(store.get(id).unwrap().title, "Buy milk");
    }

    #[test]
    fn test_drop_of_deleted_task() {
        let mut store = TaskStore::open(MemoryBackend::new());
        let id = store.add("Buy milk", "").unwrap();
        let payload = drag_payload(store.get(id).unwrap()).unwrap();
        store.delete(id).unwrap();

        assert!(!handle_drop(&mut store, &payload, Column::Completed).unwrap());
    }

    #[test]
    fn test_malformed_payload() {
        let mut store = TaskStore::open(MemoryBackend::new());
        assert!(handle_drop(&mut store, "{oops", Column::Completed).is_err());
    }

    #[test]
    fn test_column_flags() {
        assert!(Column::Completed.is_completed());
        assert!(!Column::Pending.is_completed());
        assert_eq!(Column::Pending.to_string(), "pending");
    }
}
