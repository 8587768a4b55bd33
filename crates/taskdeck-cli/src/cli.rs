//! Command-line definitions.
//!
//! Every command maps to a `Route` so it can be checked against the
//! session guard before it runs.

use std::fmt;

use clap::{Args, Parser, Subcommand};
use taskdeck_core::models::{
    Priority, ProjectInput, ProjectStatus, TaskFilter, TaskInput, TaskStatus,
};
use taskdeck_core::Route;

#[derive(Parser, Debug)]
#[command(
    name = "taskdeck",
    version,
    about = "Terminal client for the taskdeck project and task tracker",
    arg_required_else_help = true
)]
pub struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, global = true, env = "TASKDECK_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and remember the session
    Login(LoginArgs),
    /// Sign out and forget the stored session
    Logout,
    /// Show or update the signed-in user's profile
    #[command(visible_alias = "whoami")]
    Profile {
        #[command(subcommand)]
        command: Option<ProfileCommand>,
    },
    /// Confirm the stored session with the server
    Verify,
    /// Projects, tasks and users at a glance
    Dashboard,
    /// List and manage projects
    Projects {
        #[command(subcommand)]
        command: Option<ProjectCommand>,
    },
    /// List and manage tasks
    Tasks {
        #[command(subcommand)]
        command: Option<TaskCommand>,
    },
    /// List users
    Users {
        #[command(subcommand)]
        command: Option<UserCommand>,
    },
}

#[derive(Args, Clone, PartialEq)]
pub struct LoginArgs {
    /// Account username (prompted when omitted)
    #[arg(env = "TASKDECK_USERNAME")]
    pub username: Option<String>,

    /// Account password (prompted when omitted)
    #[arg(long, env = "TASKDECK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl fmt::Debug for LoginArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginArgs")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ProfileCommand {
    Show,
    /// Change username, email or password
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ProjectCommand {
    List,
    Show {
        id: i64,
    },
    /// Project with its tasks, members and statistics
    Details {
        id: i64,
    },
    Create {
        name: String,
        description: Option<String>,
        #[arg(long, value_parser = parse_project_status)]
        status: Option<ProjectStatus>,
    },
    Edit {
        id: i64,
        #[command(flatten)]
        changes: ProjectChanges,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ProjectChanges {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// active, in_progress, on_hold or completed
    #[arg(long, value_parser = parse_project_status)]
    pub status: Option<ProjectStatus>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }

    pub fn apply(&self, input: &mut ProjectInput) {
        if let Some(ref name) = self.name {
            input.name = name.trim().to_string();
        }
        if let Some(ref description) = self.description {
            input.description = description.trim().to_string();
        }
        if let Some(status) = self.status {
            input.status = status;
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TaskCommand {
    List(FilterArgs),
    Show {
        id: i64,
    },
    Create {
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    Edit {
        id: i64,
        #[command(flatten)]
        changes: TaskChanges,
    },
    /// Mark a task completed
    Done {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

/// Task attributes settable on create and edit
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    /// pending, in_progress or completed
    #[arg(long, value_parser = parse_task_status)]
    pub status: Option<TaskStatus>,
    /// low, medium or high
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,
    /// Project id
    #[arg(long = "project")]
    pub project_id: Option<i64>,
    /// Assignee user id
    #[arg(long = "user")]
    pub user_id: Option<i64>,
}

impl TaskFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, input: &mut TaskInput) {
        if let Some(ref description) = self.description {
            input.description = Some(description.trim().to_string()).filter(|d| !d.is_empty());
        }
        if let Some(status) = self.status {
            input.status = status;
        }
        if let Some(priority) = self.priority {
            input.priority = priority;
        }
        if self.project_id.is_some() {
            input.project_id = self.project_id;
        }
        if self.user_id.is_some() {
            input.user_id = self.user_id;
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    #[arg(long)]
    pub title: Option<String>,
    #[command(flatten)]
    pub fields: TaskFields,
    /// Detach the task from its project
    #[arg(long, conflicts_with = "project_id")]
    pub no_project: bool,
    /// Remove the assignee
    #[arg(long, conflicts_with = "user_id")]
    pub unassign: bool,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.fields.is_empty() && !self.no_project && !self.unassign
    }

    pub fn apply(&self, input: &mut TaskInput) {
        if let Some(ref title) = self.title {
            input.title = title.trim().to_string();
        }
        self.fields.apply(input);
        if self.no_project {
            input.project_id = None;
        }
        if self.unassign {
            input.user_id = None;
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    #[arg(long, value_parser = parse_task_status)]
    pub status: Option<TaskStatus>,
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,
    #[arg(long = "project")]
    pub project_id: Option<i64>,
    #[arg(long = "user")]
    pub user_id: Option<i64>,
    /// Match against title and description
    #[arg(long)]
    pub search: Option<String>,
}

impl From<FilterArgs> for TaskFilter {
    fn from(args: FilterArgs) -> Self {
        TaskFilter {
            search: args.search,
            status: args.status,
            priority: args.priority,
            project_id: args.project_id,
            user_id: args.user_id,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum UserCommand {
    List,
    Show { id: i64 },
}

impl Command {
    /// Route whose access rules apply to this command
    pub fn route(&self) -> Route {
        match self {
            Command::Login(_) => Route::SignIn,
            Command::Logout => Route::Landing,
            Command::Profile { .. } => Route::Profile,
            Command::Verify | Command::Dashboard | Command::Users { .. } => Route::Dashboard,
            Command::Projects { .. } => Route::Projects,
            Command::Tasks { .. } => Route::Tasks,
        }
    }
}

fn parse_project_status(value: &str) -> Result<ProjectStatus, String> {
    match ProjectStatus::parse(value) {
        ProjectStatus::Unknown => Err("expected active, in_progress, on_hold or completed".into()),
        status => Ok(status),
    }
}

fn parse_task_status(value: &str) -> Result<TaskStatus, String> {
    match TaskStatus::parse(value) {
        TaskStatus::Unknown => Err("expected pending, in_progress or completed".into()),
        status => Ok(status),
    }
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    match Priority::parse(value) {
        Priority::Unknown => Err("expected low, medium or high".into()),
        priority => Ok(priority),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use taskdeck_core::RouteAccess;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        let args = std::iter::once("taskdeck").chain(line.split_whitespace());
        Cli::try_parse_from(args).map(|cli| cli.command)
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_session_commands() {
        let Command::Login(args) = parse("login alice").unwrap() else {
            panic!("expected login");
        };
        assert_eq!(args.username.as_deref(), Some("alice"));
        assert_eq!(parse("logout").unwrap(), Command::Logout);
        assert_eq!(
            parse("whoami").unwrap(),
            Command::Profile { command: None }
        );
    }

    #[test]
    fn test_login_debug_hides_password() {
        let command = parse("login alice --password hunter2").unwrap();
        let logged = format!("{:?}", command);
        assert!(logged.contains("alice"));
        assert!(!logged.contains("hunter2"));
    }

    #[test]
    fn test_profile_update() {
        assert_eq!(
            parse("profile update --email a@example.com --password").unwrap(),
            Command::Profile {
                command: Some(ProfileCommand::Update {
                    username: None,
                    email: Some("a@example.com".to_string()),
                    password: true,
                })
            }
        );
    }

    #[test]
    fn test_project_commands() {
        assert_eq!(
            parse("projects").unwrap(),
            Command::Projects { command: None }
        );
        assert_eq!(
            parse("projects details 4").unwrap(),
            Command::Projects {
                command: Some(ProjectCommand::Details { id: 4 })
            }
        );
        assert!(parse("projects show abc").is_err());
        assert!(parse("projects create").is_err());
        assert!(parse("projects edit 2 --status archived").is_err());
    }

    #[test]
    fn test_project_edit_applies_only_given_fields() {
        let Command::Projects {
            command: Some(ProjectCommand::Edit { id, changes }),
        } = parse("projects edit 2 --status on_hold").unwrap()
        else {
            panic!("expected project edit");
        };
        assert_eq!(id, 2);

        let mut input = ProjectInput::new("Website", "Relaunch");
        changes.apply(&mut input);
        assert_eq!(input.name, "Website");
        assert_eq!(input.description, "Relaunch");
        assert_eq!(input.status, ProjectStatus::OnHold);
        assert!(ProjectChanges::default().is_empty());
    }

    #[test]
    fn test_task_filter_flags() {
        let Command::Tasks {
            command: Some(TaskCommand::List(args)),
        } = parse("tasks list --status in_progress --project 3 --search bug").unwrap()
        else {
            panic!("expected task list");
        };
        let filter = TaskFilter::from(args);
        assert_eq!(filter.status, Some(TaskStatus::InProgress));
        assert_eq!(filter.project_id, Some(3));
        assert_eq!(filter.search.as_deref(), Some("bug"));

        assert!(parse("tasks list --status someday").is_err());
        assert!(parse("tasks list --user").is_err());
    }

    #[test]
    fn test_task_create_with_every_field() {
        let Command::Tasks {
            command: Some(TaskCommand::Create { title, fields }),
        } = parse("tasks create Ship --project 2 --priority high --user 4 --status in_progress --description soon")
            .unwrap()
        else {
            panic!("expected task create");
        };

        let mut input = TaskInput::new(&title);
        fields.apply(&mut input);
        assert_eq!(input.title, "Ship");
        assert_eq!(input.project_id, Some(2));
        assert_eq!(input.user_id, Some(4));
        assert_eq!(input.priority, Priority::High);
        assert_eq!(input.status, TaskStatus::InProgress);
        assert_eq!(input.description.as_deref(), Some("soon"));
    }

    #[test]
    fn test_task_edit_clears_links() {
        let Command::Tasks {
            command: Some(TaskCommand::Edit { id, changes }),
        } = parse("tasks edit 5 --title Renamed --no-project --unassign").unwrap()
        else {
            panic!("expected task edit");
        };
        assert_eq!(id, 5);
        assert!(!changes.is_empty());

        let mut input = TaskInput::new("Old");
        input.project_id = Some(3);
        input.user_id = Some(9);
        input.priority = Priority::Low;
        changes.apply(&mut input);
        assert_eq!(input.title, "Renamed");
        assert_eq!(input.project_id, None);
        assert_eq!(input.user_id, None);
        assert_eq!(input.priority, Priority::Low);

        assert!(parse("tasks edit 5 --project 3 --no-project").is_err());
        assert!(TaskChanges::default().is_empty());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse("deploy").is_err());
    }

    #[test]
    fn test_routes_classify_access() {
        assert_eq!(
            parse("login alice").unwrap().route().access(),
            RouteAccess::GuestOnly
        );
        assert_eq!(Command::Dashboard.route().access(), RouteAccess::Protected);
        assert_eq!(
            parse("tasks show 1").unwrap().route().access(),
            RouteAccess::Protected
        );
        assert_eq!(
            parse("profile update --password").unwrap().route().access(),
            RouteAccess::Protected
        );
        assert_eq!(Command::Logout.route().access(), RouteAccess::Public);
    }
}
