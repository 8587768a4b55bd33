//! Data models for taskdeck entities.
//!
//! - `User`, `UserUpdate`: profiles and profile edits
//! - `Project`, `ProjectInput`, `ProjectDetails`: projects and their detail view
//! - `Task`, `TaskInput`, `TaskFilter`: tasks, edits and client-side filtering
//! - `Dashboard`, `DashboardStats`: the combined overview

pub mod dashboard;
pub mod project;
pub mod task;
pub mod user;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub use dashboard::{Dashboard, DashboardStats};
pub use project::{Project, ProjectDetails, ProjectInput, ProjectStatistics, ProjectStatus};
pub use task::{Priority, Task, TaskFilter, TaskInput, TaskStatus};
pub use user::{AuthResponse, User, UserUpdate};

/// Rejected form input, caught before any request is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),
}

/// Require a non-blank value for a named field
fn require(field: &'static str, value: &str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        Err(FormError::Required(field))
    } else {
        Ok(())
    }
}

/// Deserialize a count that the server may send as a number or a numeric string.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
        Null(()),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Count::Null(_) => Ok(0),
    }
}
