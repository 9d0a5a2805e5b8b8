// Query filtering for tasks

use crate::models::Task;

/// Filter for querying tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Which column(s) to include
    pub view: View,
    /// Case-insensitive substring to match against titles
    pub query: Option<String>,
}

/// Derived views over the task collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    All,
    Pending,
    Completed,
}

impl Filter {
    pub fn view(view: View) -> Self {
        Self { view, query: None }
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self {
            view: View::All,
            query: Some(query.into()),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.view.includes(task) && self.matches_query(task)
    }

    fn matches_query(&self, task: &Task) -> bool {
        match &self.query {
            Some(query) => task.title.to_lowercase().contains(&query.to_lowercase()),
            None => true,
        }
    }
}

impl View {
    pub fn includes(self, task: &Task) -> bool {
        match self {
            View::All => true,
            View::Pending => !task.completed,
            View::Completed => task.completed,
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            View::All => write!(f, "all"),
            View::Pending => write!(f, "pending"),
            View::Completed => write!(f, "completed"),
        }
    }
}
