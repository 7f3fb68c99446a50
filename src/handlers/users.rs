//! Profile management for the caller and for individual accounts

use serde_json::json;
use std::convert::Infallible;
use warp::reply::Response;

use super::response::{message, ok, ok_with_message, RequestContext};
use crate::auth::user::{User, UserPatch};
use crate::core::state::AppState;
use crate::error::{NihongoError, Result};
use crate::validation::UserUpdateRequest;

fn user_not_found() -> NihongoError {
    NihongoError::NotFound("Usuário não encontrado".to_string())
}

async fn apply_update(state: &AppState, user_id: &str, patch: UserPatch) -> Result<User> {
    if patch.is_empty() {
        return Err(NihongoError::invalid("Nenhum campo válido para atualizar"));
    }
    state
        .storage
        .user_storage()
        .update_user(user_id, patch)
        .await?
        .ok_or_else(user_not_found)
}

pub async fn get_profile(
    ctx: RequestContext,
    user: User,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(Ok(ok(json!({ "user": user })))))
}

pub async fn update_profile(
    ctx: RequestContext,
    user: User,
    body: UserUpdateRequest,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(update_own_profile(&user, body, &state).await))
}

async fn update_own_profile(
    user: &User,
    body: UserUpdateRequest,
    state: &AppState,
) -> Result<Response> {
    let patch = body.into_patch(false)?;
    let user = apply_update(state, &user.id, patch).await?;
    Ok(ok_with_message(
        "Perfil atualizado com sucesso!",
        json!({ "user": user }),
    ))
}

pub async fn deactivate_profile(
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(deactivate_account(&user, &state).await))
}

async fn deactivate_account(user: &User, state: &AppState) -> Result<Response> {
    state
        .storage
        .user_storage()
        .update_user(&user.id, UserPatch::deactivate())
        .await?
        .ok_or_else(user_not_found)?;
    log::info!("User {} deactivated their account", user.id);
    Ok(message("Conta desativada com sucesso!"))
}

pub async fn profile_stats(
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(collect_profile_stats(&user, &state).await))
}

async fn collect_profile_stats(user: &User, state: &AppState) -> Result<Response> {
    let progress = state
        .storage
        .progress_storage()
        .user_progress_stats(&user.id)
        .await?;
    Ok(ok(json!({
        "level": user.level,
        "createdAt": user.created_at,
        "lastLogin": user.last_login,
        "preferences": user.preferences,
        "progress": progress,
    })))
}

pub async fn get_user(
    user_id: String,
    ctx: RequestContext,
    _caller: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(find_user(&user_id, &state).await))
}

async fn find_user(user_id: &str, state: &AppState) -> Result<Response> {
    let user = state
        .storage
        .user_storage()
        .get_user(user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(ok(json!({ "user": user })))
}

/// Owner or admin update; unlike the profile route this may toggle `isActive`
pub async fn update_user(
    user_id: String,
    ctx: RequestContext,
    _caller: User,
    body: UserUpdateRequest,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(update_account(&user_id, body, &state).await))
}

async fn update_account(
    user_id: &str,
    body: UserUpdateRequest,
    state: &AppState,
) -> Result<Response> {
    let patch = body.into_patch(true)?;
    let user = apply_update(state, user_id, patch).await?;
    Ok(ok_with_message(
        "Usuário atualizado com sucesso!",
        json!({ "user": user }),
    ))
}
