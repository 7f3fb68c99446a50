use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::NihongoError;

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Proficiency tier. Declaration order is the tier order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    /// Ordinal used by tier gating: beginner=1, intermediate=2, advanced=3
    pub fn rank(&self) -> u8 {
        match self {
            Level::Beginner => 1,
            Level::Intermediate => 2,
            Level::Advanced => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    /// Tier a learner needs before browsing content of this level
    pub fn unlocked_by(&self) -> Level {
        match self {
            Level::Beginner | Level::Intermediate => Level::Beginner,
            Level::Advanced => Level::Intermediate,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = NihongoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            _ => Err(NihongoError::invalid("Nível inválido")),
        }
    }
}

/// Study preferences; unknown keys are kept as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Minutes per day
    #[serde(default = "default_study_time")]
    pub study_time: u32,
    #[serde(default = "default_notifications")]
    pub notifications: bool,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_study_time() -> u32 {
    30
}

fn default_notifications() -> bool {
    true
}

fn default_language() -> String {
    "pt-BR".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            study_time: default_study_time(),
            notifications: default_notifications(),
            language: default_language(),
            extra: HashMap::new(),
        }
    }
}

/// A registered learner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string; never leaves the server
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub level: Level,
    pub role: UserRole,
    pub is_active: bool,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Data needed to create an account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Partial update of a user document
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub level: Option<Level>,
    pub preferences: Option<Preferences>,
    pub is_active: Option<bool>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.level.is_none()
            && self.preferences.is_none()
            && self.is_active.is_none()
            && self.last_login.is_none()
    }

    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }

    /// Apply the patch in place
    pub fn apply(self, user: &mut User) {
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(level) = self.level {
            user.level = level;
        }
        if let Some(preferences) = self.preferences {
            user.preferences = preferences;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(last_login) = self.last_login {
            user.last_login = Some(last_login);
        }
    }
}
