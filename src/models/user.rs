//! User accounts managed through the identity provider.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::record::{FieldValue, Record};

/// Role stored in the account's public metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    #[default]
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Self::Admin, Self::Moderator, Self::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::User => "user",
        }
    }

    /// Read a metadata value; anything unrecognised is a plain user.
    pub fn from_metadata(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::validation(format!("Unknown role '{wanted}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Invited,
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub status: UserStatus,
}

impl User {
    /// "First Last", or `N/A` when the account has no name.
    pub fn compose_full_name(first_name: &str, last_name: &str) -> String {
        let name = format!("{first_name} {last_name}");
        let name = name.trim();
        if name.is_empty() {
            "N/A".to_string()
        } else {
            name.to_string()
        }
    }
}

/// Columns of the user table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Name,
    Email,
    Phone,
    Role,
    CreatedAt,
}

impl FromStr for UserField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "phone" | "mobile" => Ok(Self::Phone),
            "role" => Ok(Self::Role),
            "created" | "created_at" => Ok(Self::CreatedAt),
            other => Err(AppError::validation(format!("Unknown user column '{other}'"))),
        }
    }
}

impl Record for User {
    /// Users are cached per role.
    type Kind = Role;
    type Field = UserField;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> Role {
        self.role
    }

    fn value(&self, field: UserField) -> FieldValue<'_> {
        match field {
            UserField::Name => FieldValue::Text(&self.full_name),
            UserField::Email => FieldValue::text(Some(self.email.as_str())),
            UserField::Phone => FieldValue::text(self.phone.as_deref()),
            UserField::Role => FieldValue::Text(self.role.as_str()),
            UserField::CreatedAt => FieldValue::Integer(self.created_at.timestamp_millis()),
        }
    }
}

/// Details of an account to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// The signed-in account performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Caller {
    /// `None` when nobody is signed in
    #[serde(default)]
    pub user_id: Option<String>,

    /// Role from the caller's session claims
    #[serde(default)]
    pub role: Option<Role>,
}

impl Caller {
    pub fn signed_in(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role: Some(role),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}
