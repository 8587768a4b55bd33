//! Core library for taskdeck.
//!
//! This crate holds everything that is not presentation:
//!
//! - `auth`: credential persistence, local token validation, the session
//!   controller and the route guard built on top of it
//! - `api`: the authenticated request gateway and the typed REST client
//! - `models`: projects, tasks, users and their write payloads
//! - `config`: application configuration and directory layout

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, GatewayError};
pub use auth::{
    guard, Credential, CredentialStore, GuardDecision, Navigator, Route, RouteAccess,
    SessionController, SessionState,
};
pub use config::Config;
