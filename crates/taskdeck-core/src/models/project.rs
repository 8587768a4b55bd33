use std::fmt;

use serde::{Deserialize, Serialize};

use super::{lenient_count, require, FormError, Task, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectStatus {
    #[default]
    Active,
    InProgress,
    OnHold,
    Completed,
    /// Any status this client does not recognise
    Unknown,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Unknown => "unknown",
        }
    }

    /// Parse a wire value. Older records use a capitalised `Active`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => ProjectStatus::Active,
            "in_progress" => ProjectStatus::InProgress,
            "on_hold" => ProjectStatus::OnHold,
            "completed" => ProjectStatus::Completed,
            _ => ProjectStatus::Unknown,
        }
    }

    /// Human label ("in progress")
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl From<String> for ProjectStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Project {
    /// Status, treating a missing one as active
    pub fn status(&self) -> ProjectStatus {
        self.status.unwrap_or_default()
    }

    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("No description")
    }
}

/// Body for creating or updating a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInput {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
}

impl ProjectInput {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            status: ProjectStatus::Active,
        }
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    /// Start an edit from an existing project
    pub fn from_project(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            description: project.description.clone().unwrap_or_default(),
            status: project.status(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        require("Project name", &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectStatistics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_tasks: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub completed_tasks: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub in_progress_tasks: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub pending_tasks: u64,
}

/// Response of `GET /projects/{id}/details`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectDetails {
    pub project: Project,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub members: Vec<User>,
    #[serde(default)]
    pub statistics: Option<ProjectStatistics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(ProjectStatus::parse("Active"), ProjectStatus::Active);
        assert_eq!(ProjectStatus::parse("on_hold"), ProjectStatus::OnHold);
        assert_eq!(ProjectStatus::parse("archived"), ProjectStatus::Unknown);
        assert_eq!(ProjectStatus::InProgress.label(), "in progress");
    }

    #[test]
    fn test_project_from_json() {
        let project: Project = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Website",
            "description": null,
            "status": "Active",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(project.status(), ProjectStatus::Active);
        assert_eq!(project.description_or_default(), "No description");

        let bare: Project =
            serde_json::from_value(serde_json::json!({ "id": 4, "name": "Bare" })).unwrap();
        assert_eq!(bare.status, None);
        assert_eq!(bare.status(), ProjectStatus::Active);
    }

    #[test]
    fn test_input_serializes_wire_status() {
        let input = ProjectInput::new(" Launch ", "").with_status(ProjectStatus::OnHold);
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "Launch", "description": "", "status": "on_hold" })
        );
    }

    #[test]
    fn test_input_requires_name() {
        assert_eq!(
            ProjectInput::new("  ", "desc").validate(),
            Err(FormError::Required("Project name"))
        );
    }

    #[test]
    fn test_details_with_string_counts() {
        let details: ProjectDetails = serde_json::from_value(serde_json::json!({
            "project": { "id": 1, "name": "Website" },
            "tasks": [{ "id": 9, "title": "Draft copy", "status": "pending" }],
            "members": [{ "id": 2, "username": "bob", "email": "bob@example.com" }],
            "statistics": {
                "total_tasks": "1",
                "completed_tasks": 0,
                "in_progress_tasks": "0",
                "pending_tasks": "1"
            }
        }))
        .unwrap();

        assert_eq!(details.tasks.len(), 1);
        assert_eq!(details.members[0].username.as_deref(), Some("bob"));
        let stats = details.statistics.unwrap();
        assert_eq!(stats.total_tasks, 1);
        assert_eq!(stats.pending_tasks, 1);
    }
}
