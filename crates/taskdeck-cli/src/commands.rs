//! Command execution and terminal rendering.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context as _, Result};
use chrono::Utc;
use taskdeck_core::models::{
    Dashboard, Project, ProjectDetails, ProjectInput, Task, TaskFilter, TaskInput, TaskStatus,
    User, UserUpdate,
};
use taskdeck_core::{
    guard, ApiClient, Config, GuardDecision, Navigator, Route, SessionController, SessionState,
};
use tracing::{debug, info, warn};

use crate::cli::{Command, LoginArgs, ProfileCommand, ProjectCommand, TaskCommand, UserCommand};
use crate::format::{format_optional, format_relative_date, truncate_string};

/// Number of tasks listed on the dashboard
const DASHBOARD_RECENT_TASKS: usize = 5;

/// Width of the title/name column in lists
const NAME_COLUMN_WIDTH: usize = 32;

/// Prints a sign-in hint whenever the session layer asks for the sign-in screen.
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::SignIn => {
                eprintln!("Your session has ended. Sign in again with `taskdeck login`.")
            }
            other => debug!(route = other.path(), "Navigation requested"),
        }
    }
}

pub struct Context {
    pub config: Config,
    pub session: SessionController,
    pub api: ApiClient,
}

/// Run one command after checking it against the session guard
pub async fn run(ctx: &mut Context, command: Command) -> Result<()> {
    match guard(&ctx.session.state(), command.route().access()) {
        GuardDecision::Pending => bail!("Session state is not resolved yet"),
        GuardDecision::Redirect(Route::SignIn) => {
            bail!("Not signed in. Run `taskdeck login` first.")
        }
        GuardDecision::Redirect(Route::Dashboard) => {
            let name = ctx
                .session
                .current_user()
                .map(|u| u.display_name().to_string())
                .unwrap_or_default();
            println!("Already signed in as {}. Run `taskdeck logout` to switch users.", name);
            return Ok(());
        }
        GuardDecision::Redirect(other) => bail!("Cannot open {} from here", other.path()),
        GuardDecision::Render => {}
    }

    match command {
        Command::Login(args) => login(ctx, args).await,
        Command::Logout => {
            ctx.session.logout().context("Failed to clear stored session")?;
            println!("Signed out.");
            Ok(())
        }
        Command::Profile { command } => match command.unwrap_or(ProfileCommand::Show) {
            ProfileCommand::Show => show_profile(ctx).await,
            ProfileCommand::Update {
                username,
                email,
                password,
            } => update_profile(ctx, username, email, password).await,
        },
        Command::Verify => {
            let response = ctx.api.verify().await?;
            println!("Session is valid.");
            debug!(response = %response, "Verification response");
            Ok(())
        }
        Command::Dashboard => {
            // Mirror the dashboard screen: confirm the session before loading data
            ctx.api.verify().await?;
            let dashboard = ctx.api.dashboard().await?;
            let user = ctx.session.current_user();
            print_dashboard(user.as_ref(), &dashboard);
            Ok(())
        }
        Command::Projects { command } => {
            projects(&ctx.api, command.unwrap_or(ProjectCommand::List)).await
        }
        Command::Tasks { command } => {
            let command = command.unwrap_or_else(|| TaskCommand::List(Default::default()));
            tasks(&ctx.api, command).await
        }
        Command::Users { command } => users(&ctx.api, command.unwrap_or(UserCommand::List)).await,
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn login(ctx: &mut Context, args: LoginArgs) -> Result<()> {
    let username = match args.username.filter(|u| !u.trim().is_empty()) {
        Some(username) => username,
        None => {
            let last = ctx.config.last_username.clone().unwrap_or_default();
            let label = if last.is_empty() {
                "Username: ".to_string()
            } else {
                format!("Username [{}]: ", last)
            };
            let entered = prompt_line(&label)?;
            if entered.is_empty() {
                last
            } else {
                entered
            }
        }
    };

    let password = match args.password.filter(|p| !p.is_empty()) {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };

    if username.trim().is_empty() || password.is_empty() {
        bail!("Username and password required");
    }

    let user = ctx.api.sign_in(username.trim(), &password).await?;
    remember_username(ctx, username.trim());

    info!(user_id = user.id, "Login successful");
    println!("Signed in as {}.", user.display_name());
    Ok(())
}

/// Save the username for the next prompt. Overrides from the environment or
/// flags are not written back.
fn remember_username(ctx: &mut Context, username: &str) {
    ctx.config.last_username = Some(username.to_string());
    let saved = Config::load_file().and_then(|mut stored| {
        stored.last_username = Some(username.to_string());
        stored.save()
    });
    if let Err(e) = saved {
        warn!(error = %e, "Failed to save config");
    }
}

async fn show_profile(ctx: &Context) -> Result<()> {
    let Some(current) = ctx.session.current_user() else {
        bail!("Not signed in");
    };

    // Fetch the signed-in user's own record, falling back to the stored profile
    let user = match ctx.api.user(current.id).await {
        Ok(user) => user,
        Err(e) if e.logged_out() => return Err(e.into()),
        Err(e) if e.is_not_found() => bail!("User not found"),
        Err(e) => {
            warn!(error = %e, "Showing stored profile");
            current
        }
    };
    print_user(&user);
    Ok(())
}

fn prompt_new_password() -> Result<String> {
    let password = rpassword::prompt_password("New password: ")?;
    if password.trim().is_empty() {
        return Ok(String::new());
    }
    let confirm = rpassword::prompt_password("Confirm new password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

async fn update_profile(
    ctx: &Context,
    username: Option<String>,
    email: Option<String>,
    change_password: bool,
) -> Result<()> {
    let Some(current) = ctx.session.current_user() else {
        bail!("Not signed in");
    };

    let password = if change_password {
        Some(prompt_new_password()?)
    } else {
        None
    };

    // Unchanged fields keep the server's current values
    let existing = ctx.api.user(current.id).await?;
    let update = UserUpdate::new(
        username
            .as_deref()
            .or(existing.username.as_deref())
            .unwrap_or_default(),
        email
            .as_deref()
            .or(existing.email.as_deref())
            .unwrap_or_default(),
        password.as_deref(),
    );
    if username.is_none() && email.is_none() && update.password.is_none() {
        bail!("Nothing to update. Pass --username, --email or --password.");
    }
    update.validate()?;

    let user = ctx.api.update_user(current.id, &update).await?;
    info!(user_id = user.id, "Profile updated");
    println!("Profile updated.");
    print_user(&user);
    Ok(())
}

async fn projects(api: &ApiClient, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::List => {
            let projects = api.projects().await?;
            if projects.is_empty() {
                println!("No projects yet. Create one with `taskdeck projects create <name>`.");
            }
            for project in &projects {
                print_project_row(project);
            }
        }
        ProjectCommand::Show { id } => {
            let project = api.project(id).await?;
            print_project_row(&project);
            println!("      {}", project.description_or_default());
        }
        ProjectCommand::Details { id } => {
            let details = api.project_details(id).await?;
            print_project_details(&details);
        }
        ProjectCommand::Create {
            name,
            description,
            status,
        } => {
            let mut input = ProjectInput::new(&name, description.as_deref().unwrap_or_default());
            if let Some(status) = status {
                input = input.with_status(status);
            }
            input.validate()?;
            let project = api.create_project(&input).await?;
            println!("Created project #{} {}", project.id, project.name);
        }
        ProjectCommand::Edit { id, changes } => {
            if changes.is_empty() {
                bail!("Nothing to change. Pass --name, --description or --status.");
            }
            let project = api.project(id).await?;
            let mut input = ProjectInput::from_project(&project);
            changes.apply(&mut input);
            input.validate()?;
            let project = api.update_project(id, &input).await?;
            println!("Updated project #{} {}", project.id, project.name);
        }
        ProjectCommand::Delete { id } => {
            api.delete_project(id).await?;
            println!("Deleted project #{}", id);
        }
    }
    Ok(())
}

async fn tasks(api: &ApiClient, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::List(args) => {
            let tasks = api.tasks().await?;
            print_task_list(&tasks, &TaskFilter::from(args));
        }
        TaskCommand::Show { id } => {
            let task = api.task(id).await?;
            print_task_row(&task);
            println!(
                "      {}",
                format_optional(task.description.as_deref(), "No description")
            );
        }
        TaskCommand::Create { title, fields } => {
            let mut input = TaskInput::new(&title);
            fields.apply(&mut input);
            input.validate()?;
            let task = api.create_task(&input).await?;
            println!("Created task #{} {}", task.id, task.title);
        }
        TaskCommand::Edit { id, changes } => {
            if changes.is_empty() {
                bail!("Nothing to change. See `taskdeck tasks edit --help`.");
            }
            let task = api.task(id).await?;
            let mut input = TaskInput::from_task(&task);
            changes.apply(&mut input);
            input.validate()?;
            let task = api.update_task(id, &input).await?;
            println!("Updated task #{} {}", task.id, task.title);
        }
        TaskCommand::Done { id } => {
            let task = api.task(id).await?;
            if task.is_completed() {
                println!("Task #{} is already completed", id);
                return Ok(());
            }
            let mut input = TaskInput::from_task(&task);
            input.status = TaskStatus::Completed;
            let task = api.update_task(id, &input).await?;
            println!("Completed task #{} {}", task.id, task.title);
        }
        TaskCommand::Delete { id } => {
            api.delete_task(id).await?;
            println!("Deleted task #{}", id);
        }
    }
    Ok(())
}

async fn users(api: &ApiClient, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::List => {
            for user in api.users().await? {
                println!(
                    "{:>5}  {:<24} {}",
                    user.id,
                    user.display_name(),
                    format_optional(user.email.as_deref(), "-")
                );
            }
        }
        UserCommand::Show { id } => match api.user(id).await {
            Ok(user) => print_user(&user),
            Err(e) if e.is_not_found() => bail!("User not found"),
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

fn print_user(user: &User) {
    println!("#{} {}", user.id, user.display_name());
    println!("  Username: {}", format_optional(user.username.as_deref(), "-"));
    println!("  Email:    {}", format_optional(user.email.as_deref(), "-"));
}

fn print_project_row(project: &Project) {
    println!(
        "{:>5}  {:<width$} {:<12} {}",
        project.id,
        truncate_string(&project.name, NAME_COLUMN_WIDTH),
        project.status().label(),
        format_relative_date(project.created_at.as_deref(), Utc::now()),
        width = NAME_COLUMN_WIDTH
    );
}

fn print_task_row(task: &Task) {
    println!(
        "{:>5}  {:<width$} {:<12} {:<7} {}",
        task.id,
        truncate_string(&task.title, NAME_COLUMN_WIDTH),
        task.status().label(),
        task.priority.map(|p| p.to_string()).unwrap_or_default(),
        format_optional(task.assigned_user_name.as_deref(), ""),
        width = NAME_COLUMN_WIDTH
    );
}

fn print_task_list(tasks: &[Task], filter: &TaskFilter) {
    let shown = filter.apply(tasks);
    if shown.is_empty() {
        if filter.is_empty() {
            println!("No tasks yet. Create one with `taskdeck tasks create <title>`.");
        } else {
            println!("No tasks match the filter.");
        }
        return;
    }
    for task in &shown {
        print_task_row(task);
    }
    if !filter.is_empty() {
        println!("({} of {} tasks)", shown.len(), tasks.len());
    }
}

fn print_project_details(details: &ProjectDetails) {
    let project = &details.project;
    println!("{} ({})", project.name, project.status().label());
    println!("{}", project.description_or_default());
    println!(
        "Created {}",
        format_relative_date(project.created_at.as_deref(), Utc::now())
    );

    if let Some(ref stats) = details.statistics {
        println!(
            "\nTasks: {} total, {} completed, {} in progress, {} pending",
            stats.total_tasks, stats.completed_tasks, stats.in_progress_tasks, stats.pending_tasks
        );
    }

    println!("\nTasks");
    if details.tasks.is_empty() {
        println!("  No tasks yet.");
    }
    for task in &details.tasks {
        print_task_row(task);
    }

    println!("\nMembers");
    if details.members.is_empty() {
        println!("  No team members. Assign tasks to add members to this project.");
    }
    for member in &details.members {
        println!(
            "  {} <{}>",
            member.display_name(),
            format_optional(member.email.as_deref(), "-")
        );
    }
}

fn print_dashboard(user: Option<&User>, dashboard: &Dashboard) {
    let name = user.map(User::display_name).unwrap_or("User");
    let stats = &dashboard.stats;

    println!("Welcome back, {}!\n", name);
    println!(
        "Projects: {} ({} active, {} completed)",
        stats.total_projects, stats.active_projects, stats.completed_projects
    );
    println!(
        "Tasks:    {} ({} completed, {} in progress, {} pending, {}% done)",
        stats.total_tasks,
        stats.completed_tasks,
        stats.in_progress_tasks,
        stats.pending_tasks,
        stats.completion_percent()
    );
    println!("Users:    {}", stats.total_users);

    let recent = dashboard.recent_tasks(DASHBOARD_RECENT_TASKS);
    if !recent.is_empty() {
        println!("\nRecent tasks");
        for task in recent {
            println!(
                "  #{:<5} {:<width$} {:<16} {}",
                task.id,
                truncate_string(&task.title, NAME_COLUMN_WIDTH),
                truncate_string(dashboard.project_name(task.project_id), 16),
                dashboard.user_name(task.user_id),
                width = NAME_COLUMN_WIDTH
            );
        }
    }
}

/// Session state as a one-line summary (for debug logging)
pub fn describe_state(state: &SessionState) -> String {
    match state {
        SessionState::Unresolved => "unresolved".to_string(),
        SessionState::LoggedOut => "signed out".to_string(),
        SessionState::LoggedIn(user) => format!("signed in as {}", user.display_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_state() {
        assert_eq!(describe_state(&SessionState::LoggedOut), "signed out");
        let user = User {
            id: 1,
            username: Some("alice".to_string()),
            ..Default::default()
        };
        assert_eq!(
            describe_state(&SessionState::LoggedIn(user)),
            "signed in as alice"
        );
    }
}
