use std::fmt;

use serde::{Deserialize, Serialize};

use super::{require, FormError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => TaskStatus::Pending,
            "in_progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Unknown,
        }
    }

    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Unknown,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            _ => Priority::Unknown,
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        priority.as_str().to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub assigned_user_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Task {
    /// Status, treating a missing one as pending
    pub fn status(&self) -> TaskStatus {
        self.status.unwrap_or_default()
    }

    pub fn is_completed(&self) -> bool {
        self.status() == TaskStatus::Completed
    }
}

/// Body for creating or updating a task. Empty optional fields go out as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub project_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl TaskInput {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            project_id: None,
            user_id: None,
        }
    }

    /// Start an edit from an existing task
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().filter(|d| !d.is_empty()),
            status: task.status(),
            priority: task.priority.unwrap_or_default(),
            project_id: task.project_id,
            user_id: task.user_id,
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        require("Title", &self.title)
    }
}

/// Client-side task list filter. Every set criterion must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Case-insensitive match on title or description
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub project_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_title && !in_description {
                return false;
            }
        }

        if let Some(status) = self.status {
            if task.status != Some(status) {
                return false;
            }
        }

        if let Some(priority) = self.priority {
            if task.priority != Some(priority) {
                return false;
            }
        }

        if self.project_id.is_some() && task.project_id != self.project_id {
            return false;
        }

        if self.user_id.is_some() && task.user_id != self.user_id {
            return false;
        }

        true
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, title: &str, status: &str, priority: &str, project: Option<i64>) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: Some(format!("Details for {}", title)),
            status: Some(TaskStatus::parse(status)),
            priority: Some(Priority::parse(priority)),
            project_id: project,
            user_id: Some(id * 10),
            assigned_user_name: None,
            created_at: None,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task(1, "Write launch post", "pending", "high", Some(1)),
            task(2, "Fix login bug", "in_progress", "high", Some(2)),
            task(3, "Archive old tickets", "completed", "low", Some(1)),
        ]
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let tasks = sample();
        let filter = TaskFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&tasks).len(), 3);
    }

    #[test]
    fn test_search_covers_title_and_description() {
        let tasks = sample();
        let filter = TaskFilter {
            search: Some("LOGIN".to_string()),
            ..Default::default()
        };
        let ids: Vec<i64> = filter.apply(&tasks).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2]);

        let filter = TaskFilter {
            search: Some("details for archive".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&tasks)[0].id, 3);
    }

    #[test]
    fn test_criteria_combine() {
        let tasks = sample();
        let filter = TaskFilter {
            priority: Some(Priority::High),
            project_id: Some(1),
            ..Default::default()
        };
        let ids: Vec<i64> = filter.apply(&tasks).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1]);

        let filter = TaskFilter {
            status: Some(TaskStatus::Completed),
            user_id: Some(30),
            ..Default::default()
        };
        assert_eq!(filter.apply(&tasks).len(), 1);
    }

    #[test]
    fn test_task_defaults() {
        let task: Task =
            serde_json::from_value(serde_json::json!({ "id": 5, "title": "Untriaged" })).unwrap();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(!task.is_completed());
    }

    #[test]
    fn test_input_from_task_and_wire_shape() {
        let existing = task(2, "Fix login bug", "in_progress", "high", None);
        let mut input = TaskInput::from_task(&existing);
        input.status = TaskStatus::Completed;

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["priority"], "high");
        assert!(json["project_id"].is_null());
        assert_eq!(json["user_id"], 20);
    }

    #[test]
    fn test_input_requires_title() {
        assert_eq!(TaskInput::new("   ").validate(), Err(FormError::Required("Title")));
        assert!(TaskInput::new("Ship").validate().is_ok());
    }
}
