// Persisted state envelope: { "tasks": [...], "version": N }

use crate::models::Task;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Schema version written alongside the task list
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub tasks: Vec<Task>,
    pub version: u32,
}

impl PersistedState {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            version: SCHEMA_VERSION,
        }
    }
}

/// Serialize the task list into the stored form
pub fn encode(tasks: &[Task]) -> Result<String> {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        tasks: &'a [Task],
        version: u32,
    }

    serde_json::to_string(&Borrowed {
        tasks,
        version: SCHEMA_VERSION,
    })
    .context("Failed to serialize task state")
}

/// Parse stored state
///
/// Returns None when the data is malformed or carries a different schema
/// version. There is no migration path, so both cases read as "no data".
pub fn decode(raw: &str) -> Option<Vec<Task>> {
    let state: PersistedState = match serde_json::from_str(raw) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Stored task state is malformed, starting empty");
            return None;
        }
    };

    if state.version != SCHEMA_VERSION {
        warn!(
            found = state.version,
            expected = SCHEMA_VERSION,
            "Stored task state has an unsupported version, starting empty"
        );
        return None;
    }

    Some(state.tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskId;
    use chrono::DateTime;

    fn task(id: i64, title: &str) -> Task {
        Task::new(
            TaskId::new(id),
            title.to_string(),
            String::new(),
            DateTime::from_timestamp_millis(id).unwrap(),
        )
    }

    #[test]
    fn test_encode_shape() {
        let raw = encode(&[task(1, "Buy milk")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["tasks"][0]["title"], "Buy milk");
    }

    #[test]
    fn test_decode_preserves_order() {
        let tasks = vec![task(3, "Third"), task(1, "First"), task(2, "Second")];
        let raw = encode(&tasks).unwrap();
        assert_eq!(decode(&raw).unwrap(), tasks);
    }

    #[test]
    fn test_decode_malformed_is_none() {
        assert!(decode("{not json").is_none());
        assert!(decode(r#"{"tasks": 5, "version": 1}"#).is_none());
        assert!(decode("").is_none());
    }

    #[test]
    fn test_decode_version_mismatch_is_none() {
        let raw = r#"{"tasks": [], "version": 2}"#;
        assert!(decode(raw).is_none());
    }

    #[test]
    fn test_persisted_state_new_uses_current_version() {
        let state = PersistedState::new(vec![]);
        assert_eq!(state.version, SCHEMA_VERSION);
    }
}
