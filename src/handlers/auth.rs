//! Account registration, login and token lifecycle

use serde_json::json;
use std::convert::Infallible;
use warp::reply::Response;

use super::response::{created, ok_with_message, RequestContext};
use crate::auth::user::{NewUser, User, UserRole};
use crate::core::state::AppState;
use crate::error::{NihongoError, Result};
use crate::validation::{LoginRequest, RegisterRequest};

pub async fn register(
    ctx: RequestContext,
    body: RegisterRequest,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(register_user(body, &state).await))
}

async fn register_user(body: RegisterRequest, state: &AppState) -> Result<Response> {
    let registration = body.validate()?;
    let users = state.storage.user_storage();

    if users.get_user_by_email(&registration.email).await?.is_some()
        || users
            .get_user_by_username(&registration.username)
            .await?
            .is_some()
    {
        return Err(NihongoError::ConflictError(
            "Usuário já existe com este email ou nome de usuário".to_string(),
        ));
    }

    let role = if state.config.is_admin_email(&registration.email) {
        UserRole::Admin
    } else {
        UserRole::User
    };
    let password_hash = state.passwords.hash(&registration.password).await?;

    let user = users
        .create_user(NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
            first_name: registration.first_name,
            last_name: registration.last_name,
            role,
        })
        .await?;
    let token = state.tokens.issue(&user.id, &user.email)?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(created(
        "Usuário criado com sucesso!",
        json!({ "user": user, "token": token }),
    ))
}

pub async fn login(
    ctx: RequestContext,
    body: LoginRequest,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(login_user(body, &state).await))
}

async fn login_user(body: LoginRequest, state: &AppState) -> Result<Response> {
    let (email, password) = body.validate()?;
    let users = state.storage.user_storage();

    let user = users
        .get_user_by_email(&email)
        .await?
        .ok_or(NihongoError::InvalidCredentials)?;

    // Unknown email and wrong password are indistinguishable to the caller
    if !state.passwords.verify(&password, &user.password_hash).await? {
        log::debug!("Failed login for user {}", user.id);
        return Err(NihongoError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(NihongoError::IdentityInactive);
    }

    users.record_login(&user.id).await?;
    let token = state.tokens.issue(&user.id, &user.email)?;
    let user = users.get_user(&user.id).await?.unwrap_or(user);

    Ok(ok_with_message(
        "Login realizado com sucesso!",
        json!({ "user": user, "token": token }),
    ))
}

pub async fn verify(
    ctx: RequestContext,
    user: User,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(Ok(ok_with_message("Token válido", json!({ "user": user })))))
}

pub async fn refresh(
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .tokens
        .issue(&user.id, &user.email)
        .map(|token| ok_with_message("Token renovado com sucesso!", json!({ "token": token })));
    Ok(ctx.finish(result))
}
