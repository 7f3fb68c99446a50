//! Authorization gates
//!
//! Pure predicates over an already authenticated user and the request's path
//! parameters. Each returns `Ok(())` to let the request through or a 403
//! `Forbidden` error. They never touch storage, so routes may stack them in
//! any order.

use super::user::{Level, User};
use crate::error::{NihongoError, Result};

/// What kind of resource an ownership check protects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    Progress,
}

/// Path parameters an ownership check looks at
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceParams<'a> {
    /// `:id`
    pub id: Option<&'a str>,
    /// `:userId`
    pub user_id: Option<&'a str>,
}

impl<'a> ResourceParams<'a> {
    pub fn id(id: &'a str) -> Self {
        Self {
            id: Some(id),
            user_id: None,
        }
    }

    pub fn user_id(user_id: &'a str) -> Self {
        Self {
            id: None,
            user_id: Some(user_id),
        }
    }
}

/// Only administrators pass
pub fn require_admin(user: &User) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        log::warn!("User {} denied admin access", user.id);
        Err(NihongoError::Forbidden(
            "Acesso negado. Requer privilégios de administrador".to_string(),
        ))
    }
}

/// Administrators, or the user the resource belongs to
pub fn authorize_resource(user: &User, kind: ResourceKind, params: ResourceParams<'_>) -> Result<()> {
    if user.is_admin() {
        return Ok(());
    }

    let resource_id = params.id.or(params.user_id);
    if resource_id == Some(user.id.as_str()) {
        return Ok(());
    }

    if kind == ResourceKind::Progress && params.user_id == Some(user.id.as_str()) {
        return Ok(());
    }

    log::debug!("User {} denied access to {:?} resource", user.id, kind);
    Err(NihongoError::Forbidden(
        "Acesso negado a este recurso".to_string(),
    ))
}

/// Users at `minimum` or above pass
pub fn require_level(user: &User, minimum: Level) -> Result<()> {
    if user.level.rank() >= minimum.rank() {
        Ok(())
    } else {
        Err(NihongoError::Forbidden(format!(
            "Nível mínimo requerido: {}",
            minimum
        )))
    }
}
