//! REST API client module for the taskdeck backend.
//!
//! Every call goes through `ApiClient`, the authenticated request gateway:
//! it attaches the stored bearer token, classifies responses, and on a
//! 401 tears the session down through the `SessionController`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::GatewayError;
