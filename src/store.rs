// Task store: in-memory collection mirrored to a key-value backend

use crate::backend::{StorageBackend, validate_key};
use crate::filter::{Filter, View};
use crate::models::{Task, TaskId, TaskPatch, validate_title};
use crate::snapshot;
use chrono::{DateTime, Utc};
use eyre::{Context, Result, eyre};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "todo-storage";

/// The authoritative task collection
///
/// Every operation that changes the collection writes the full state to the
/// backend before returning. If that write fails the in-memory change is kept
/// and the error reports that the durable copy is stale.
pub struct TaskStore<B: StorageBackend> {
    backend: B,
    key: String,
    tasks: Vec<Task>,
    /// Highest id ever issued or loaded; ids are never reused
    last_id: i64,
}

impl<B: StorageBackend> TaskStore<B> {
    /// Open a store under the default storage key
    ///
    /// Missing, unreadable or malformed stored state yields an empty store.
    pub fn open(backend: B) -> Self {
        Self::load(backend, DEFAULT_STORAGE_KEY.to_string())
    }

    /// Open a store under a custom storage key
    pub fn open_with_key(backend: B, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self::load(backend, key))
    }

    fn load(backend: B, key: String) -> Self {
        let stored = match backend.get_item(&key) {
            Ok(Some(raw)) => snapshot::decode(&raw).unwrap_or_default(),
            Ok(None) => {
                debug!(key = %key, "No stored task state");
                Vec::new()
            }
            Err(e) => {
                warn!(key = %key, error = ?e, "Failed to read stored task state, starting empty");
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(stored.len());
        for mut task in stored {
            match validate_title(&task.title) {
                Ok(title) => task.title = title,
                Err(e) => {
                    warn!(id = %task.id, error = %e, "Dropping stored task with invalid title");
                    continue;
                }
            }
            if seen.insert(task.id) {
                tasks.push(task);
            } else {
                warn!(id = %task.id, "Dropping stored task with duplicate id");
            }
        }

        let last_id = tasks.iter().map(|t| t.id.as_i64()).max().unwrap_or(0);
        info!(key = %key, count = tasks.len(), "Opened task store");

        Self {
            backend,
            key,
            tasks,
            last_id,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consume the store, handing back its backend
    pub fn into_backend(self) -> B {
        self.backend
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a new pending task at the end of the collection
    pub fn add(&mut self, title: &str, description: &str) -> Result<TaskId> {
        let title = validate_title(title)?;
        let created_at = Utc::now();
        let id = self.next_id(created_at)?;

        self.tasks.push(Task::new(id, title, description.to_string(), created_at));
        debug!(%id, "Added task");

        self.persist()?;
        Ok(id)
    }

    /// Merge `patch` over the task with `id`
    ///
    /// Returns false, without writing, when no task has that id.
    pub fn update(&mut self, id: TaskId, mut patch: TaskPatch) -> Result<bool> {
        if let Some(title) = patch.title.take() {
            patch.title = Some(validate_title(&title)?);
        }

        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(%id, "update: no such task");
            return Ok(false);
        };
        task.apply(patch);

        self.persist()?;
        Ok(true)
    }

    /// Remove the task with `id`
    pub fn delete(&mut self, id: TaskId) -> Result<bool> {
        let Some(pos) = self.position(id) else {
            debug!(%id, "delete: no such task");
            return Ok(false);
        };
        self.tasks.remove(pos);

        self.persist()?;
        Ok(true)
    }

    /// Flip the completed flag of the task with `id`
    pub fn toggle_complete(&mut self, id: TaskId) -> Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(%id, "toggle_complete: no such task");
            return Ok(false);
        };
        task.completed = !task.completed;

        self.persist()?;
        Ok(true)
    }

    /// Remove every completed task, returning how many were removed
    pub fn clear_completed(&mut self) -> Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();

        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Remove every task, returning how many were removed
    pub fn clear_all(&mut self) -> Result<usize> {
        let removed = self.tasks.len();
        self.tasks.clear();

        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Put the collection into the order of `tasks`
    ///
    /// `tasks` must hold exactly the current ids, each once. Anything else is
    /// rejected and the collection is left untouched. Only the order is taken
    /// from `tasks`; the stored fields of each task are kept.
    pub fn reorder(&mut self, tasks: Vec<Task>) -> Result<()> {
        if tasks.len() != self.tasks.len() {
            return Err(eyre!(
                "Reorder expected {} tasks, got {}",
                self.tasks.len(),
                tasks.len()
            ));
        }

        let mut current: HashMap<TaskId, Task> = self.tasks.iter().map(|t| (t.id, t.clone())).collect();
        let mut seen = HashSet::with_capacity(tasks.len());
        let mut reordered = Vec::with_capacity(tasks.len());
        for task in &tasks {
            if !seen.insert(task.id) {
                return Err(eyre!("Reorder contains task id {} more than once", task.id));
            }
            match current.remove(&task.id) {
                Some(stored) => reordered.push(stored),
                None => return Err(eyre!("Reorder contains unknown task id {}", task.id)),
            }
        }

        self.tasks = reordered;
        self.persist()
    }

    /// Move one task to `index`, shifting the others
    ///
    /// An index past the end moves the task to the end.
    pub fn move_task(&mut self, id: TaskId, index: usize) -> Result<bool> {
        let Some(pos) = self.position(id) else {
            debug!(%id, "move_task: no such task");
            return Ok(false);
        };

        let task = self.tasks.remove(pos);
        let index = index.min(self.tasks.len());
        self.tasks.insert(index, task);

        self.persist()?;
        Ok(true)
    }

    /// Add copies of `tasks` with fresh ids, keeping description, completion
    /// and creation time
    ///
    /// All titles are validated before anything is added.
    pub fn import(&mut self, tasks: Vec<Task>) -> Result<Vec<TaskId>> {
        let mut validated = Vec::with_capacity(tasks.len());
        for task in tasks {
            let title = validate_title(&task.title).with_context(|| format!("Cannot import task {}", task.id))?;
            validated.push((title, task));
        }

        let last_id = self.last_id;
        let mut ids = Vec::with_capacity(validated.len());
        for (_, source) in &validated {
            match self.next_id(source.created_at) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    self.last_id = last_id;
                    return Err(e);
                }
            }
        }

        for (id, (title, source)) in ids.iter().copied().zip(validated) {
            let mut task = Task::new(id, title, source.description, source.created_at);
            task.completed = source.completed;
            self.tasks.push(task);
        }

        if !ids.is_empty() {
            info!(count = ids.len(), "Imported tasks");
            self.persist()?;
        }
        Ok(ids)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The whole collection in order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks matching `filter`, in collection order
    pub fn list(&self, filter: &Filter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn pending(&self) -> Vec<&Task> {
        self.list(&Filter::view(View::Pending))
    }

    pub fn completed(&self) -> Vec<&Task> {
        self.list(&Filter::view(View::Completed))
    }

    /// Tasks whose title contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<&Task> {
        self.list(&Filter::search(query))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Next id: the creation time in ms, bumped past the last issued id when
    /// the clock has not moved on
    fn next_id(&mut self, created_at: DateTime<Utc>) -> Result<TaskId> {
        let after_last = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| eyre!("Task id space exhausted"))?;
        let candidate = created_at.timestamp_millis().max(after_last);
        self.last_id = candidate;
        Ok(TaskId::new(candidate))
    }

    /// Write the full state to the backend
    fn persist(&mut self) -> Result<()> {
        let raw = snapshot::encode(&self.tasks)?;
        self.backend
            .set_item(&self.key, &raw)
            .context("Failed to persist task state")?;
        debug!(key = %self.key, count = self.tasks.len(), "Persisted task state");
        Ok(())
    }
}
