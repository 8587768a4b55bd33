//! API client for the taskdeck REST backend.
//!
//! `ApiClient` is the single path for every network call. It builds the
//! headers (JSON content type plus the stored bearer token), classifies the
//! response, and on `401 Unauthorized` clears the stored credential, moves
//! the session to logged-out and requests navigation to sign-in.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{SessionController, ValidationError};
use crate::config::Config;
use crate::models::{
    AuthResponse, Dashboard, Project, ProjectDetails, ProjectInput, Task, TaskInput, User,
    UserUpdate,
};

use super::error::ErrorBody;
use super::GatewayError;

/// Message used when sign-in is refused without a server-provided reason
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Authenticated request gateway.
/// Clone is cheap - reqwest::Client and the session share their state.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionController,
}

impl ApiClient {
    /// Create a client for `base_url` with no request timeout
    pub fn new(base_url: &str, session: SessionController) -> Result<Self, GatewayError> {
        Self::build(base_url, None, session)
    }

    pub fn from_config(config: &Config, session: SessionController) -> Result<Self, GatewayError> {
        Self::build(
            &config.api_base_url,
            config.request_timeout_secs.map(Duration::from_secs),
            session,
        )
    }

    fn build(
        base_url: &str,
        timeout: Option<Duration>,
        session: SessionController,
    ) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Merge caller headers with the two the gateway owns
    fn auth_headers(&self, mut headers: HeaderMap) -> Result<HeaderMap, GatewayError> {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.remove(header::AUTHORIZATION);

        if let Some(token) = self.session.token()? {
            let mut value = match HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())) {
                Ok(value) => value,
                Err(_) => {
                    self.session.expire();
                    return Err(ValidationError::Malformed(
                        "token is not a valid header value".to_string(),
                    )
                    .into());
                }
            };
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> Result<Response, GatewayError> {
        let url = self.url(path);
        let headers = self.auth_headers(headers)?;

        debug!(%method, path, "Sending request");
        let mut request = self.client.request(method.clone(), &url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(%method, path, error = %e, "Request failed to send");
            GatewayError::Network(e)
        })?;
        debug!(%method, path, status = response.status().as_u16(), "Response received");
        Ok(response)
    }

    /// Classify a response; returns the body of a success
    async fn check_response(
        &self,
        response: Response,
    ) -> Result<(StatusCode, Vec<u8>), GatewayError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // The body is informational only; a missing or broken one is fine
            let detail = response
                .bytes()
                .await
                .ok()
                .and_then(|body| ErrorBody::parse(&body))
                .and_then(ErrorBody::into_message);
            warn!(detail = ?detail, "Authentication failed; ending session");
            self.session.expire();
            return Err(GatewayError::AuthenticationFailed);
        }

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            debug!(
                status = status.as_u16(),
                body = %GatewayError::truncate_body(&body),
                "Request failed"
            );
            return Err(GatewayError::from_failure(status.as_u16(), &body));
        }

        Ok((status, response.bytes().await?.to_vec()))
    }

    fn parse_json<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, GatewayError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(GatewayError::invalid_body(status.as_u16(), "empty body"));
        }
        serde_json::from_slice(body).map_err(|e| {
            debug!(body = %GatewayError::truncate_body(body), "Unparsable success body");
            GatewayError::invalid_body(status.as_u16(), e)
        })
    }

    /// Issue an authenticated request and decode its JSON body
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, GatewayError> {
        self.request_with_headers(method, path, body, HeaderMap::new())
            .await
    }

    /// As `request`, with extra caller headers.
    ///
    /// `Content-Type` and `Authorization` are always set by the gateway.
    pub async fn request_with_headers<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> Result<T, GatewayError> {
        let response = self.send(method, path, body, headers).await?;
        let (status, body) = self.check_response(response).await?;
        Self::parse_json(status, &body)
    }

    /// Issue an authenticated request whose success body is ignored (may be empty)
    pub async fn request_no_content(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(), GatewayError> {
        let response = self.send(method, path, body, HeaderMap::new()).await?;
        self.check_response(response).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.request(Method::GET, path, None).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let body = serde_json::to_value(body)
            .map_err(|e| GatewayError::RequestFailed {
                status: None,
                message: format!("Failed to encode request body: {}", e),
            })?;
        self.request(method, path, Some(&body)).await
    }

    // ===== Authentication =====

    /// Sign in with username and password and establish the session.
    ///
    /// This call carries no bearer token, and a refusal is reported as
    /// `RequestFailed` rather than tearing down a session.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<User, GatewayError> {
        let body = serde_json::json!({ "username": username, "password": password });

        let response = self
            .client
            .post(self.url("/auth/login"))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await.unwrap_or_default();
        if !status.is_success() {
            let err = match GatewayError::from_failure(status.as_u16(), &bytes) {
                GatewayError::RequestFailed { status: Some(401), message }
                    if message.starts_with("HTTP error") =>
                {
                    GatewayError::RequestFailed {
                        status: Some(401),
                        message: INVALID_CREDENTIALS_MESSAGE.to_string(),
                    }
                }
                other => other,
            };
            warn!(status = status.as_u16(), "Sign-in refused");
            return Err(err);
        }

        let auth: AuthResponse = Self::parse_json(status, &bytes)?;
        if auth.token.expose_secret().trim().is_empty() {
            warn!("Sign-in response carried no token");
            return Err(GatewayError::invalid_body(status.as_u16(), "missing token"));
        }
        self.session.login(auth.user.clone(), auth.token.expose_secret())?;
        Ok(auth.user)
    }

    /// Check the stored token locally, then confirm it with the server.
    ///
    /// A token failing the local check ends the session exactly like a 401.
    pub async fn verify(&self) -> Result<Value, GatewayError> {
        if let Err(e) = self.session.check_stored_token() {
            warn!(error = %e, "Stored token failed local validation");
            self.session.expire();
            return Err(e.into());
        }
        self.get("/auth/verify").await
    }

    // ===== Projects =====

    pub async fn projects(&self) -> Result<Vec<Project>, GatewayError> {
        self.get("/projects").await
    }

    pub async fn project(&self, id: i64) -> Result<Project, GatewayError> {
        self.get(&format!("/projects/{}", id)).await
    }

    pub async fn project_details(&self, id: i64) -> Result<ProjectDetails, GatewayError> {
        self.get(&format!("/projects/{}/details", id)).await
    }

    pub async fn create_project(&self, input: &ProjectInput) -> Result<Project, GatewayError> {
        self.send_json(Method::POST, "/projects", input).await
    }

    pub async fn update_project(
        &self,
        id: i64,
        input: &ProjectInput,
    ) -> Result<Project, GatewayError> {
        self.send_json(Method::PUT, &format!("/projects/{}", id), input)
            .await
    }

    pub async fn delete_project(&self, id: i64) -> Result<(), GatewayError> {
        self.request_no_content(Method::DELETE, &format!("/projects/{}", id), None)
            .await
    }

    // ===== Tasks =====

    pub async fn tasks(&self) -> Result<Vec<Task>, GatewayError> {
        self.get("/tasks").await
    }

    pub async fn task(&self, id: i64) -> Result<Task, GatewayError> {
        self.get(&format!("/tasks/{}", id)).await
    }

    pub async fn create_task(&self, input: &TaskInput) -> Result<Task, GatewayError> {
        self.send_json(Method::POST, "/tasks", input).await
    }

    pub async fn update_task(&self, id: i64, input: &TaskInput) -> Result<Task, GatewayError> {
        self.send_json(Method::PUT, &format!("/tasks/{}", id), input)
            .await
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), GatewayError> {
        self.request_no_content(Method::DELETE, &format!("/tasks/{}", id), None)
            .await
    }

    // ===== Users =====

    pub async fn users(&self) -> Result<Vec<User>, GatewayError> {
        self.get("/users").await
    }

    pub async fn user(&self, id: i64) -> Result<User, GatewayError> {
        self.get(&format!("/users/{}", id)).await
    }

    /// Update a profile. Editing the signed-in user also refreshes the stored profile.
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<User, GatewayError> {
        let user: User = self
            .send_json(Method::PUT, &format!("/users/{}", id), update)
            .await?;
        if let Err(e) = self.session.update_profile(user.clone()) {
            warn!(error = %e, "Failed to refresh stored profile");
        }
        Ok(user)
    }

    // ===== Dashboard =====

    /// Fetch tasks, projects and users concurrently and combine them
    pub async fn dashboard(&self) -> Result<Dashboard, GatewayError> {
        let (tasks, projects, users) =
            futures::try_join!(self.tasks(), self.projects(), self.users())?;
        debug!(
            tasks = tasks.len(),
            projects = projects.len(),
            users = users.len(),
            "Dashboard data fetched"
        );
        Ok(Dashboard::new(tasks, projects, users))
    }
}

// ============================================================================
// Tests
// ============================================================================
