//! Route gating derived from the session state.

use super::session::SessionState;

/// Navigation targets the session layer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    SignIn,
    SignUp,
    Dashboard,
    Projects,
    Tasks,
    Profile,
}

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Anyone
    Public,
    /// Only visitors who are not signed in (sign-in, sign-up)
    GuestOnly,
    /// Only signed-in users
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not resolved yet; render nothing decisive
    Pending,
    Render,
    Redirect(Route),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::SignIn => "/signin",
            Route::SignUp => "/signup",
            Route::Dashboard => "/dashboard",
            Route::Projects => "/dashboard/projects",
            Route::Tasks => "/dashboard/tasks",
            Route::Profile => "/dashboard/profile",
        }
    }

    pub fn access(&self) -> RouteAccess {
        match self {
            Route::Landing => RouteAccess::Public,
            Route::SignIn | Route::SignUp => RouteAccess::GuestOnly,
            Route::Dashboard | Route::Projects | Route::Tasks | Route::Profile => {
                RouteAccess::Protected
            }
        }
    }
}

/// Decide what a view may do for a route of the given access level.
pub fn guard(state: &SessionState, access: RouteAccess) -> GuardDecision {
    match (state, access) {
        (SessionState::Unresolved, _) => GuardDecision::Pending,
        (_, RouteAccess::Public) => GuardDecision::Render,
        (SessionState::LoggedIn(_), RouteAccess::GuestOnly) => {
            GuardDecision::Redirect(Route::Dashboard)
        }
        (SessionState::LoggedOut, RouteAccess::Protected) => GuardDecision::Redirect(Route::SignIn),
        (SessionState::LoggedOut, RouteAccess::GuestOnly)
        | (SessionState::LoggedIn(_), RouteAccess::Protected) => GuardDecision::Render,
    }
}
