use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{error::AccountError, repo_types::User};

const MAX_FIELD_LEN: usize = 255;

/// Request body for registration. Absent and `null` fields read as empty
/// strings and are rejected by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Request body for token issuance.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl TokenRequest {
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

impl CreateUserRequest {
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Shape checks only; emptiness of the email and the password policy
    /// are enforced by the account service.
    pub fn validate(&self) -> Result<(), AccountError> {
        let email = self.email().trim();
        if email.chars().count() > MAX_FIELD_LEN {
            return Err(AccountError::validation("email is too long"));
        }
        if !email.is_empty() && !is_valid_email(email) {
            return Err(AccountError::validation("enter a valid email address"));
        }
        let name = self.name().trim();
        if name.is_empty() {
            return Err(AccountError::validation("name is required"));
        }
        if name.chars().count() > MAX_FIELD_LEN {
            return Err(AccountError::validation("name is too long"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(email: &str, name: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: Some(email.into()),
            password: Some("test_password_1234".into()),
            name: Some(name.into()),
        }
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("user_test@email.com"));
        assert!(!is_valid_email("user_test"));
        assert!(!is_valid_email("a b@c.d"));
    }

    #[test]
    fn validate_request_fields() {
        assert!(req("user_test@email.com", "Full Name").validate().is_ok());
        assert!(req("", "Full Name").validate().is_ok());
        assert!(req("not-an-email", "Full Name").validate().is_err());
        assert!(req("user_test@email.com", "  ").validate().is_err());
        assert!(req("user_test@email.com", &"x".repeat(256)).validate().is_err());
    }

    #[test]
    fn public_user_never_serializes_secrets() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            name: "Full Name".into(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let req: TokenRequest = serde_json::from_str(r#"{"email":"user@email.com"}"#).unwrap();
        assert_eq!(req.password(), "");
    }

    #[test]
    fn null_fields_read_as_empty() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"email":null,"password":null,"name":null}"#).unwrap();
        assert_eq!(req.email(), "");
        assert_eq!(req.password(), "");
        assert!(req.validate().is_err());

        let req: TokenRequest = serde_json::from_str(r#"{"email":null,"password":null}"#).unwrap();
        assert_eq!(req.email(), "");
        assert_eq!(req.password(), "");
    }
}
