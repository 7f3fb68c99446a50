//! Warp filters for shared state, authentication and the authorization gates
//!
//! Gates reject with the crate error; the recovery handler renders it.

use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::SocketAddr;
use warp::hyper::body::Bytes;
use warp::path::FullPath;
use warp::{Filter, Rejection};

use super::response::RequestContext;
use crate::auth::authenticator::authenticate;
use crate::auth::gates::{authorize_resource, require_admin, require_level, ResourceKind, ResourceParams};
use crate::auth::user::{Level, User};
use crate::constants::MAX_BODY_BYTES;
use crate::core::state::AppState;
use crate::error::NihongoError;

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Method and path of the current request
pub fn request_context(
    development: bool,
) -> impl Filter<Extract = (RequestContext,), Error = Infallible> + Clone {
    warp::method()
        .and(warp::path::full())
        .map(move |method, path: FullPath| RequestContext::new(method, path.as_str(), development))
}

/// Authentication gate: resolves the bearer token into an active user
pub fn authenticated(
    state: AppState,
) -> impl Filter<Extract = (RequestContext, User), Error = Rejection> + Clone {
    request_context(state.development_mode())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_state(state))
        .and_then(
            |ctx: RequestContext, header: Option<String>, state: AppState| async move {
                let users = state.storage.user_storage();
                match authenticate(header.as_deref(), &state.tokens, users).await {
                    Ok(user) => Ok((ctx.with_caller(&user.id), user)),
                    Err(error) => {
                        ctx.log_failure(&error);
                        log::debug!("{} {} rejected: {}", ctx.method, ctx.path, error);
                        Err(warp::reject::custom(error))
                    }
                }
            },
        )
        .untuple_one()
}

/// Authentication followed by the role gate
pub fn admin_only(
    state: AppState,
) -> impl Filter<Extract = (RequestContext, User), Error = Rejection> + Clone {
    authenticated(state)
        .and_then(|ctx: RequestContext, user: User| async move {
            require_admin(&user)
                .map(|_| (ctx, user))
                .map_err(warp::reject::custom)
        })
        .untuple_one()
}

/// Ownership gate over the path segment captured just before authentication
pub async fn check_owner(
    kind: ResourceKind,
    resource: String,
    ctx: RequestContext,
    user: User,
) -> Result<(String, RequestContext, User), Rejection> {
    let params = match kind {
        ResourceKind::User => ResourceParams::id(&resource),
        ResourceKind::Progress => ResourceParams::user_id(&resource),
    };
    authorize_resource(&user, kind, params).map_err(warp::reject::custom)?;
    Ok((resource, ctx, user))
}

/// Ownership gate for `/users/:id`
pub async fn owns_account(
    user_id: String,
    ctx: RequestContext,
    user: User,
) -> Result<(String, RequestContext, User), Rejection> {
    check_owner(ResourceKind::User, user_id, ctx, user).await
}

/// Ownership gate for `/progress/user/:userId`
pub async fn owns_progress(
    user_id: String,
    ctx: RequestContext,
    user: User,
) -> Result<(String, RequestContext, User), Rejection> {
    check_owner(ResourceKind::Progress, user_id, ctx, user).await
}

/// Tier gate whose minimum depends on the content level being requested
pub async fn check_content_level(
    requested: Option<Level>,
    ctx: RequestContext,
    user: User,
) -> Result<(RequestContext, User), Rejection> {
    if let Some(level) = requested {
        require_level(&user, level.unlocked_by()).map_err(warp::reject::custom)?;
    }
    Ok((ctx, user))
}

/// Path segment with percent-encoding removed, for free-text and non-ASCII terms
pub fn decoded_segment() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::path::param::<String>().and_then(|raw: String| async move {
        urlencoding::decode(&raw)
            .map(|decoded| decoded.into_owned())
            .map_err(|_| warp::reject::custom(NihongoError::invalid("Parâmetros inválidos")))
    })
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8], empty: Option<T>) -> Result<T, Rejection> {
    if bytes.len() as u64 > MAX_BODY_BYTES {
        return Err(warp::reject::custom(NihongoError::invalid(
            "Corpo da requisição muito grande",
        )));
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        if let Some(value) = empty {
            return Ok(value);
        }
    }
    serde_json::from_slice(bytes)
        .map_err(|_| warp::reject::custom(NihongoError::invalid("JSON inválido")))
}

/// JSON request body with a size cap.
///
/// Parse failures reject with the crate error rather than warp's own, so that
/// the first matching route reports them ahead of sibling routes.
pub fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::bytes().and_then(|bytes: Bytes| async move { parse_body::<T>(&bytes, None) })
}

/// JSON request body that may be absent; an empty body yields `T::default()`
pub fn optional_json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Default + Send,
{
    warp::body::bytes()
        .and_then(|bytes: Bytes| async move { parse_body(&bytes, Some(T::default())) })
}

/// Query string parameters; malformed values are a 400 with the crate envelope
pub fn query<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send + 'static,
{
    warp::query::<T>().or_else(|_| async {
        Err::<(T,), Rejection>(warp::reject::custom(NihongoError::invalid(
            "Parâmetros inválidos",
        )))
    })
}

/// Tier gate for routes that name the content level in the path: reaching
/// a level requires the one below it
pub async fn check_level_param(
    raw: String,
    ctx: RequestContext,
    user: User,
) -> Result<(Level, RequestContext, User), Rejection> {
    let level: Level = raw.parse().map_err(warp::reject::custom)?;
    require_level(&user, level.unlocked_by()).map_err(warp::reject::custom)?;
    Ok((level, ctx, user))
}

/// Per-client request budget for the API prefix
pub fn rate_limit(state: AppState) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::addr::remote()
        .and(with_state(state))
        .and_then(|addr: Option<SocketAddr>, state: AppState| async move {
            let client = addr
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            if state.rate_limiter.allow_request(&client).await {
                Ok(())
            } else {
                log::warn!("Rate limit exceeded for client {}", client);
                Err(warp::reject::custom(NihongoError::RateLimited))
            }
        })
        .untuple_one()
}
