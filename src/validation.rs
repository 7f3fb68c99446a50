//! Request payloads and their validation rules
//!
//! Every rule is checked and all problems are reported together in the
//! `errors` list of a 400 response.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::auth::user::{Level, Preferences, UserPatch};
use crate::constants::{
    PASSWORD_MIN_LENGTH, STUDY_TIME_MAX_MINUTES, STUDY_TIME_MIN_MINUTES, USERNAME_MAX_LENGTH,
    USERNAME_MIN_LENGTH,
};
use crate::error::{NihongoError, Result};

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_some_and(|re| re.is_match(email))
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn finish(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(NihongoError::validation(errors))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Registration payload after validation
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration> {
        let mut errors = Vec::new();

        let username_len = self.username.as_deref().map_or(0, |u| u.chars().count());
        if username_len < USERNAME_MIN_LENGTH {
            errors.push(format!(
                "Nome de usuário deve ter pelo menos {} caracteres",
                USERNAME_MIN_LENGTH
            ));
        }
        if username_len > USERNAME_MAX_LENGTH {
            errors.push(format!(
                "Nome de usuário deve ter no máximo {} caracteres",
                USERNAME_MAX_LENGTH
            ));
        }

        if !self.email.as_deref().is_some_and(is_valid_email) {
            errors.push("Email inválido".to_string());
        }

        let password_len = self.password.as_deref().map_or(0, |p| p.chars().count());
        if password_len < PASSWORD_MIN_LENGTH {
            errors.push(format!(
                "Senha deve ter pelo menos {} caracteres",
                PASSWORD_MIN_LENGTH
            ));
        }

        if is_blank(self.first_name.as_deref()) {
            errors.push("Nome é obrigatório".to_string());
        }
        if is_blank(self.last_name.as_deref()) {
            errors.push("Sobrenome é obrigatório".to_string());
        }

        finish(errors)?;

        Ok(Registration {
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default().trim().to_string(),
            last_name: self.last_name.unwrap_or_default().trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns (email, password)
    pub fn validate(self) -> Result<(String, String)> {
        let mut errors = Vec::new();
        if is_blank(self.email.as_deref()) {
            errors.push("Email é obrigatório".to_string());
        }
        if is_blank(self.password.as_deref()) {
            errors.push("Senha é obrigatória".to_string());
        }
        finish(errors)?;

        Ok((
            self.email.unwrap_or_default().trim().to_string(),
            self.password.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub level: Option<String>,
    pub preferences: Option<Preferences>,
    pub is_active: Option<bool>,
}

impl UserUpdateRequest {
    /// Validate and turn into a patch. `isActive` is only honoured when
    /// `allow_status` is set.
    pub fn into_patch(self, allow_status: bool) -> Result<UserPatch> {
        let mut errors = Vec::new();

        if self.first_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.push("Nome não pode estar vazio".to_string());
        }
        if self.last_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.push("Sobrenome não pode estar vazio".to_string());
        }

        let level = match self.level.as_deref() {
            Some(raw) => match raw.parse::<Level>() {
                Ok(level) => Some(level),
                Err(_) => {
                    errors.push("Nível inválido".to_string());
                    None
                }
            },
            None => None,
        };

        if let Some(preferences) = &self.preferences {
            if !(STUDY_TIME_MIN_MINUTES..=STUDY_TIME_MAX_MINUTES).contains(&preferences.study_time)
            {
                errors.push(format!(
                    "Tempo de estudo deve estar entre {} e {} minutos",
                    STUDY_TIME_MIN_MINUTES, STUDY_TIME_MAX_MINUTES
                ));
            }
        }

        finish(errors)?;

        Ok(UserPatch {
            first_name: self.first_name.map(|n| n.trim().to_string()),
            last_name: self.last_name.map(|n| n.trim().to_string()),
            level,
            preferences: self.preferences,
            is_active: if allow_status { self.is_active } else { None },
            last_login: None,
        })
    }
}
