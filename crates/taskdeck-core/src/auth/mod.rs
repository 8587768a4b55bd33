//! Authentication module for managing the client-side session.
//!
//! This module provides:
//! - `CredentialStore`: atomic persistence of the bearer token and user profile
//! - `token`: local structural and expiry checks on a stored token
//! - `SessionController`: the process-wide logged-in / logged-out state
//! - `guard`: the routing decision derived from that state
//!
//! Credentials live in a pluggable key/value backend (JSON file, OS keychain
//! or memory) under the keys `token` and `user`.

pub mod credentials;
pub mod guard;
pub mod session;
pub mod token;

pub use credentials::{
    Credential, CredentialStore, FileStorage, KeyringStorage, MemoryStorage, Storage, StoreError,
};
pub use guard::{guard, GuardDecision, Route, RouteAccess};
pub use session::{Navigator, NoopNavigator, SessionController, SessionState};
pub use token::{TokenClaims, ValidationError};
