use super::{Project, ProjectStatus, Task, TaskStatus, User};

/// Counts shown at the top of the dashboard, derived from task and project statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_projects: usize,
    pub active_projects: usize,
    pub completed_projects: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub pending_tasks: usize,
    pub total_users: usize,
}

impl DashboardStats {
    pub fn compute(tasks: &[Task], projects: &[Project], users: &[User]) -> Self {
        let count_tasks = |status: TaskStatus| tasks.iter().filter(|t| t.status() == status).count();
        let count_projects =
            |status: ProjectStatus| projects.iter().filter(|p| p.status() == status).count();

        Self {
            total_projects: projects.len(),
            active_projects: count_projects(ProjectStatus::Active),
            completed_projects: count_projects(ProjectStatus::Completed),
            total_tasks: tasks.len(),
            completed_tasks: count_tasks(TaskStatus::Completed),
            in_progress_tasks: count_tasks(TaskStatus::InProgress),
            pending_tasks: count_tasks(TaskStatus::Pending),
            total_users: users.len(),
        }
    }

    /// Whole-number share of completed tasks; 0 when there are none
    pub fn completion_percent(&self) -> u8 {
        if self.total_tasks == 0 {
            return 0;
        }
        let percent = (self.completed_tasks * 100) / self.total_tasks;
        u8::try_from(percent).unwrap_or(100)
    }
}

/// Everything the overview screen needs, fetched together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub users: Vec<User>,
    pub stats: DashboardStats,
}

impl Dashboard {
    pub fn new(tasks: Vec<Task>, projects: Vec<Project>, users: Vec<User>) -> Self {
        let stats = DashboardStats::compute(&tasks, &projects, &users);
        Self {
            tasks,
            projects,
            users,
            stats,
        }
    }

    pub fn user_name(&self, user_id: Option<i64>) -> &str {
        user_id
            .and_then(|id| self.users.iter().find(|u| u.id == id))
            .and_then(|u| u.username.as_deref())
            .unwrap_or("Unassigned")
    }

    pub fn project_name(&self, project_id: Option<i64>) -> &str {
        project_id
            .and_then(|id| self.projects.iter().find(|p| p.id == id))
            .map(|p| p.name.as_str())
            .unwrap_or("No Project")
    }

    /// Up to `limit` tasks, newest id first
    pub fn recent_tasks(&self, limit: usize) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        tasks.sort_by(|a, b| b.id.cmp(&a.id));
        tasks.truncate(limit);
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Dashboard {
        let tasks: Vec<Task> = serde_json::from_value(serde_json::json!([
            { "id": 1, "title": "a", "status": "completed", "project_id": 10, "user_id": 100 },
            { "id": 2, "title": "b", "status": "in_progress", "project_id": 10 },
            { "id": 3, "title": "c" },
            { "id": 4, "title": "d", "status": "completed" }
        ]))
        .unwrap();
        let projects: Vec<Project> = serde_json::from_value(serde_json::json!([
            { "id": 10, "name": "Website", "status": "Active" },
            { "id": 11, "name": "Migration", "status": "completed" },
            { "id": 12, "name": "Hiring", "status": "on_hold" }
        ]))
        .unwrap();
        let users: Vec<User> = serde_json::from_value(serde_json::json!([
            { "id": 100, "username": "alice" }
        ]))
        .unwrap();
        Dashboard::new(tasks, projects, users)
    }

    #[test]
    fn test_stats_follow_real_statuses() {
        let stats = fixture().stats;
        assert_eq!(stats.total_tasks, 4);
        assert_eq!(stats.completed_tasks, 2);
        assert_eq!(stats.in_progress_tasks, 1);
        // Missing status counts as pending
        assert_eq!(stats.pending_tasks, 1);
        assert_eq!(stats.active_projects, 1);
        assert_eq!(stats.completed_projects, 1);
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.completion_percent(), 50);
    }

    #[test]
    fn test_completion_percent_without_tasks() {
        assert_eq!(DashboardStats::default().completion_percent(), 0);
    }

    #[test]
    fn test_lookups() {
        let dashboard = fixture();
        assert_eq!(dashboard.user_name(Some(100)), "alice");
        assert_eq!(dashboard.user_name(Some(999)), "Unassigned");
        assert_eq!(dashboard.user_name(None), "Unassigned");
        assert_eq!(dashboard.project_name(Some(10)), "Website");
        assert_eq!(dashboard.project_name(None), "No Project");
    }

    #[test]
    fn test_recent_tasks() {
        let dashboard = fixture();
        let ids: Vec<i64> = dashboard.recent_tasks(2).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }
}
