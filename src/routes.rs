//! Route tree for the HTTP API
//!
//! Literal paths are registered ahead of parameterised siblings so that
//! `/lessons/search/...` is never read as a lesson id.

use std::convert::Infallible;
use warp::filters::body::BodyDeserializeError;
use warp::filters::cors::CorsForbidden;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::auth::user::User;
use crate::constants::API_PREFIX;
use crate::core::state::AppState;
use crate::error::NihongoError;
use crate::handlers::filters::{
    admin_only, authenticated, check_content_level, check_level_param, decoded_segment,
    json_body, optional_json_body, owns_account, owns_progress, query, rate_limit,
    request_context, with_state,
};
use crate::handlers::response::{error_response, failure, RequestContext};
use crate::handlers::vocabulary::VocabularyQuery;
use crate::handlers::{admin, auth, health, lessons, progress, users, vocabulary};
use crate::security::with_api_security_headers;

/// Render any rejection as the JSON envelope
pub async fn handle_rejection(
    rejection: Rejection,
    development: bool,
) -> Result<Response, Infallible> {
    let response = if let Some(error) = rejection.find::<NihongoError>() {
        error_response(error, development)
    } else if rejection.is_not_found() {
        failure(StatusCode::NOT_FOUND, "Rota não encontrada")
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        failure(StatusCode::METHOD_NOT_ALLOWED, "Método não permitido")
    } else if rejection.find::<BodyDeserializeError>().is_some() {
        failure(StatusCode::BAD_REQUEST, "JSON inválido")
    } else if rejection.find::<InvalidQuery>().is_some() {
        failure(StatusCode::BAD_REQUEST, "Parâmetros inválidos")
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        failure(StatusCode::PAYLOAD_TOO_LARGE, "Corpo da requisição muito grande")
    } else if rejection.find::<CorsForbidden>().is_some() {
        failure(StatusCode::FORBIDDEN, "Origem não permitida")
    } else {
        log::error!("Unhandled rejection: {:?}", rejection);
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor")
    };
    Ok(response)
}

fn auth_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let dev = state.development_mode();

    let register = warp::path!("auth" / "register")
        .and(warp::post())
        .and(request_context(dev))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(auth::register);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(request_context(dev))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(auth::login);

    let verify = warp::path!("auth" / "verify")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and_then(auth::verify);

    let refresh = warp::path!("auth" / "refresh")
        .and(warp::post())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(auth::refresh);

    register
        .or(login)
        .unify()
        .or(verify)
        .unify()
        .or(refresh)
        .unify()
        .boxed()
}

fn user_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let get_profile = warp::path!("users" / "profile")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and_then(users::get_profile);

    let update_profile = warp::path!("users" / "profile")
        .and(warp::put())
        .and(authenticated(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(users::update_profile);

    let deactivate_profile = warp::path!("users" / "profile")
        .and(warp::delete())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(users::deactivate_profile);

    let profile_stats = warp::path!("users" / "profile" / "stats")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(users::profile_stats);

    let get_user = warp::path!("users" / String)
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and_then(owns_account)
        .untuple_one()
        .and(with_state(state.clone()))
        .and_then(users::get_user);

    let update_user = warp::path!("users" / String)
        .and(warp::put())
        .and(authenticated(state.clone()))
        .and_then(owns_account)
        .untuple_one()
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(users::update_user);

    get_profile
        .or(update_profile)
        .unify()
        .or(deactivate_profile)
        .unify()
        .or(profile_stats)
        .unify()
        .or(get_user)
        .unify()
        .or(update_user)
        .unify()
        .boxed()
}

fn lesson_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let dev = state.development_mode();

    let list = warp::path!("lessons")
        .and(warp::get())
        .and(request_context(dev))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(lessons::list_lessons);

    let stats = warp::path!("lessons" / "stats" / "overview")
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(lessons::lesson_stats);

    let search = warp::path("lessons")
        .and(warp::path("search"))
        .and(decoded_segment())
        .and(warp::path::end())
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(lessons::search_lessons);

    let by_level = warp::path!("lessons" / "level" / String)
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and_then(check_level_param)
        .untuple_one()
        .and(with_state(state.clone()))
        .and_then(lessons::lessons_by_level);

    let by_category = warp::path!("lessons" / "category" / String)
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(lessons::lessons_by_category);

    let vocabulary = warp::path!("lessons" / String / "vocabulary")
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(lessons::lesson_vocabulary);

    let next = warp::path!("lessons" / String / "next")
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(lessons::next_lesson);

    let previous = warp::path!("lessons" / String / "previous")
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(lessons::previous_lesson);

    let get = warp::path!("lessons" / String)
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(lessons::get_lesson);

    list.or(stats)
        .unify()
        .or(search)
        .unify()
        .or(by_level)
        .unify()
        .or(by_category)
        .unify()
        .or(vocabulary)
        .unify()
        .or(next)
        .unify()
        .or(previous)
        .unify()
        .or(get)
        .unify()
        .boxed()
}

/// Authenticated session request whose optional `level` query runs the tier gate
fn study_session(
    state: &AppState,
) -> impl Filter<Extract = (RequestContext, User, VocabularyQuery), Error = Rejection> + Clone {
    authenticated(state.clone())
        .and(query::<VocabularyQuery>())
        .and_then(
            |ctx: RequestContext, user: User, params: VocabularyQuery| async move {
                let (ctx, user) = check_content_level(params.level, ctx, user).await?;
                Ok::<_, Rejection>((ctx, user, params))
            },
        )
        .untuple_one()
}

fn vocabulary_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let dev = state.development_mode();

    let by_lesson = warp::path!("vocabulary" / "lesson" / String)
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(vocabulary::by_lesson);

    let by_category = warp::path("vocabulary")
        .and(warp::path("category"))
        .and(decoded_segment())
        .and(warp::path::end())
        .and(warp::get())
        .and(request_context(dev))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(vocabulary::by_category);

    let by_level = warp::path!("vocabulary" / "level" / String)
        .and(warp::get())
        .and(request_context(dev))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(vocabulary::by_level);

    let search = warp::path("vocabulary")
        .and(warp::path("search"))
        .and(decoded_segment())
        .and(warp::path::end())
        .and(warp::get())
        .and(request_context(dev))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(vocabulary::search);

    let by_tag = warp::path("vocabulary")
        .and(warp::path("tags"))
        .and(decoded_segment())
        .and(warp::path::end())
        .and(warp::get())
        .and(request_context(dev))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(vocabulary::by_tag);

    let practice = warp::path!("vocabulary" / "random" / "practice")
        .and(warp::get())
        .and(request_context(dev))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(vocabulary::random_practice);

    let review = warp::path!("vocabulary" / "review" / "session")
        .and(warp::get())
        .and(study_session(state))
        .and(with_state(state.clone()))
        .and_then(vocabulary::review_session);

    let test = warp::path!("vocabulary" / "test" / "session")
        .and(warp::get())
        .and(study_session(state))
        .and(with_state(state.clone()))
        .and_then(vocabulary::test_session);

    let stats = warp::path!("vocabulary" / "stats" / "overview")
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(vocabulary::stats);

    let get = warp::path!("vocabulary" / String)
        .and(warp::get())
        .and(request_context(dev))
        .and(with_state(state.clone()))
        .and_then(vocabulary::get_entry);

    by_lesson
        .or(by_category)
        .unify()
        .or(by_level)
        .unify()
        .or(search)
        .unify()
        .or(by_tag)
        .unify()
        .or(practice)
        .unify()
        .or(review)
        .unify()
        .or(test)
        .unify()
        .or(stats)
        .unify()
        .or(get)
        .unify()
        .boxed()
}

fn progress_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let mine = warp::path!("progress" / "my-progress")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(progress::my_progress);

    let completed = warp::path!("progress" / "completed")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(progress::completed);

    let in_progress = warp::path!("progress" / "in-progress")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(progress::in_progress);

    let favorites = warp::path!("progress" / "favorites")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(progress::favorites);

    let stats = warp::path!("progress" / "stats")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(progress::my_stats);

    let leaderboard = warp::path!("progress" / "leaderboard")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(progress::leaderboard);

    let get_lesson = warp::path!("progress" / "lesson" / String)
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and(with_state(state.clone()))
        .and_then(progress::get_lesson_progress);

    let record = warp::path!("progress" / "lesson" / String)
        .and(warp::post())
        .and(authenticated(state.clone()))
        .and(optional_json_body())
        .and(with_state(state.clone()))
        .and_then(progress::record_progress);

    let complete = warp::path!("progress" / "lesson" / String / "complete")
        .and(warp::put())
        .and(authenticated(state.clone()))
        .and(optional_json_body())
        .and(with_state(state.clone()))
        .and_then(progress::complete_lesson);

    let score = warp::path!("progress" / "lesson" / String / "score")
        .and(warp::put())
        .and(authenticated(state.clone()))
        .and(optional_json_body())
        .and(with_state(state.clone()))
        .and_then(progress::update_score);

    let favorite = warp::path!("progress" / "lesson" / String / "favorite")
        .and(warp::put())
        .and(authenticated(state.clone()))
        .and(optional_json_body())
        .and(with_state(state.clone()))
        .and_then(progress::set_favorite);

    let user_progress = warp::path!("progress" / "user" / String)
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and_then(owns_progress)
        .untuple_one()
        .and(with_state(state.clone()))
        .and_then(progress::user_progress);

    let user_stats = warp::path!("progress" / "user" / String / "stats")
        .and(warp::get())
        .and(authenticated(state.clone()))
        .and_then(owns_progress)
        .untuple_one()
        .and(with_state(state.clone()))
        .and_then(progress::user_stats);

    mine.or(completed)
        .unify()
        .or(in_progress)
        .unify()
        .or(favorites)
        .unify()
        .or(stats)
        .unify()
        .or(leaderboard)
        .unify()
        .or(get_lesson)
        .unify()
        .or(record)
        .unify()
        .or(complete)
        .unify()
        .or(score)
        .unify()
        .or(favorite)
        .unify()
        .or(user_progress)
        .unify()
        .or(user_stats)
        .unify()
        .boxed()
}

fn admin_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let stats = warp::path!("admin" / "stats")
        .and(warp::get())
        .and(admin_only(state.clone()))
        .and(with_state(state.clone()))
        .and_then(admin::stats);

    let collections = warp::path!("admin" / "collections")
        .and(warp::get())
        .and(admin_only(state.clone()))
        .and(with_state(state.clone()))
        .and_then(admin::collections);

    let documents = warp::path!("admin" / "collections" / String)
        .and(warp::get())
        .and(admin_only(state.clone()))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(admin::collection_documents);

    let document = warp::path!("admin" / "collections" / String / String)
        .and(warp::get())
        .and(admin_only(state.clone()))
        .and(with_state(state.clone()))
        .and_then(admin::document);

    let create_lesson = warp::path!("admin" / "lessons")
        .and(warp::post())
        .and(admin_only(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(admin::create_lesson);

    let update_lesson = warp::path!("admin" / "lessons" / String)
        .and(warp::put())
        .and(admin_only(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(admin::update_lesson);

    let deactivate_lesson = warp::path!("admin" / "lessons" / String)
        .and(warp::delete())
        .and(admin_only(state.clone()))
        .and(with_state(state.clone()))
        .and_then(admin::deactivate_lesson);

    let create_vocabulary = warp::path!("admin" / "vocabulary")
        .and(warp::post())
        .and(admin_only(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(admin::create_vocabulary);

    let deactivate_vocabulary = warp::path!("admin" / "vocabulary" / String)
        .and(warp::delete())
        .and(admin_only(state.clone()))
        .and(with_state(state.clone()))
        .and_then(admin::deactivate_vocabulary);

    stats
        .or(collections)
        .unify()
        .or(documents)
        .unify()
        .or(document)
        .unify()
        .or(create_lesson)
        .unify()
        .or(update_lesson)
        .unify()
        .or(deactivate_lesson)
        .unify()
        .or(create_vocabulary)
        .unify()
        .or(deactivate_vocabulary)
        .unify()
        .boxed()
}

/// Everything below `/api`
pub fn api_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let status = warp::path!("status")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(health::api_status);

    auth_routes(state)
        .or(user_routes(state))
        .unify()
        .or(lesson_routes(state))
        .unify()
        .or(vocabulary_routes(state))
        .unify()
        .or(progress_routes(state))
        .unify()
        .or(admin_routes(state))
        .unify()
        .or(status)
        .unify()
        .boxed()
}

/// Complete filter tree: status endpoints, rate-limited API, error rendering,
/// CORS, security headers and access logging
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let development = state.development_mode();
    let recover = move |rejection: Rejection| handle_rejection(rejection, development);

    let root = warp::path::end()
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(health::root);

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(health::health);

    let api = warp::path(API_PREFIX)
        .and(rate_limit(state.clone()))
        .and(api_routes(&state));

    let cors = warp::cors()
        .allow_origins(state.config.allowed_origins.iter().map(String::as_str))
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_headers(vec!["content-type", "authorization"])
        .allow_credentials(true);

    root.or(health)
        .unify()
        .or(api)
        .unify()
        .recover(recover)
        .with(cors)
        .recover(recover)
        .map(with_api_security_headers)
        .with(warp::log("nihongo_api::access"))
}
