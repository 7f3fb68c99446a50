//! Resolves the caller behind an `Authorization` header

use super::token::{extract_bearer_token, TokenManager};
use super::user::User;
use crate::error::{NihongoError, Result};
use crate::storage::traits::UserStorage;

/// Authenticate a request from its raw `Authorization` header.
///
/// A missing or malformed header is `MissingToken`; token failures keep their
/// own variant; the subject must exist and be active.
pub async fn authenticate(
    auth_header: Option<&str>,
    tokens: &TokenManager,
    users: &dyn UserStorage,
) -> Result<User> {
    let token = auth_header
        .and_then(extract_bearer_token)
        .ok_or(NihongoError::MissingToken)?;

    let claims = tokens.verify(token)?;

    let user = users
        .get_user(&claims.sub)
        .await?
        .ok_or(NihongoError::IdentityNotFound)?;

    if !user.is_active {
        log::debug!("Rejected token for deactivated user {}", user.id);
        return Err(NihongoError::IdentityInactive);
    }

    Ok(user)
}
