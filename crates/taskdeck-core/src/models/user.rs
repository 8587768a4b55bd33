use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require, FormError};

/// A user profile as returned by the server and kept in the credential store.
///
/// Fields this client does not model are preserved in `extra` so the stored
/// profile round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Name for greetings: full name, then username, then a generic label
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.username.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or("User")
    }
}

/// Response to a successful sign-in.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: SecretString,
    pub user: User,
}

/// Profile edit. The password is only sent when one was entered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn new(username: &str, email: &str, password: Option<&str>) -> Self {
        Self {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        require("Username", &self.username)?;
        require("Email", &self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_preference() {
        let mut user = User {
            id: 1,
            username: Some("alice".to_string()),
            name: Some("Alice Liddell".to_string()),
            ..Default::default()
        };
        assert_eq!(user.display_name(), "Alice Liddell");

        user.name = None;
        assert_eq!(user.display_name(), "alice");

        user.username = Some(String::new());
        assert_eq!(user.display_name(), "User");
    }

    #[test]
    fn test_update_omits_blank_password() {
        let update = UserUpdate::new("alice", "a@example.com", Some("   "));
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("password").is_none());

        let update = UserUpdate::new("alice", "a@example.com", Some("hunter2"));
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["password"], "hunter2");
    }

    #[test]
    fn test_update_requires_username_and_email() {
        assert_eq!(
            UserUpdate::new(" ", "a@example.com", None).validate(),
            Err(FormError::Required("Username"))
        );
        assert_eq!(
            UserUpdate::new("alice", "", None).validate(),
            Err(FormError::Required("Email"))
        );
        assert!(UserUpdate::new("alice", "a@example.com", None).validate().is_ok());
    }
}
