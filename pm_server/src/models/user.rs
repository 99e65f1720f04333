//! Tracker users and their public profile.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::clearance::Clearance;
use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub clearance_level: Clearance,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub can_delegate: bool,
    #[serde(default)]
    pub delegated_to: Option<String>,
    #[serde(default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const COLLECTION: CollectionName = CollectionName::Users;
    const LABEL: &'static str = "User";
    const READ_ONLY: &'static [&'static str] = &["email", "password_hash"];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> TrackerResult<()> {
        validate_email(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(TrackerError::Validation("Name is required".into()));
        }
        Ok(())
    }
}

pub fn validate_email(email: &str) -> TrackerResult<()> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(TrackerError::Validation(format!("Invalid email address: {email}")))
    }
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub clearance_level: Clearance,
    pub department: Option<String>,
    pub rank: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> TrackerResult<()> {
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(TrackerError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A user as returned over the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub clearance_level: Clearance,
    pub department: Option<String>,
    pub rank: Option<String>,
    pub can_delegate: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            clearance_level: user.clearance_level,
            department: user.department.clone(),
            rank: user.rank.clone(),
            can_delegate: user.can_delegate,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password: password.into(),
            name: "Test".into(),
            role: Role::User,
            clearance_level: Clearance::Public,
            department: None,
            rank: None,
        }
    }

    #[test]
    fn registration_checks_email_and_password() {
        assert!(request("a@defense.gov", "secret1").validate().is_ok());
        assert!(request("not-an-email", "secret1").validate().is_err());
        assert!(request("a@defense.gov", "short").validate().is_err());
    }

    #[test]
    fn profile_omits_password_hash() {
        let user = User {
            id: "u1".into(),
            email: "a@defense.gov".into(),
            name: "A".into(),
            role: Role::Admin,
            clearance_level: Clearance::Secret,
            department: None,
            rank: None,
            can_delegate: true,
            delegated_to: None,
            password_hash: "$2b$hash".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
        assert_eq!(json["clearance_level"], "secret");
    }
}
