//! Per-user lesson progress

use serde::Deserialize;
use std::convert::Infallible;
use warp::reply::Response;

use super::lessons::lesson_not_found;
use super::response::{created, ok, ok_with_message, RequestContext};
use crate::auth::user::User;
use crate::constants::{DEFAULT_LEADERBOARD_SIZE, MAX_PAGE_SIZE, MAX_SCORE};
use crate::core::state::AppState;
use crate::error::{NihongoError, Result};
use crate::storage::models::{NewProgress, ProgressPatch, ProgressQuery, ProgressStatus};

/// Scores arrive as raw JSON so every route applies the same rules through `parse_score`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateRequest {
    pub status: Option<ProgressStatus>,
    pub score: Option<serde_json::Value>,
    pub time_spent: Option<u64>,
    pub notes: Option<String>,
}

impl ProgressUpdateRequest {
    fn into_patch(self) -> Result<ProgressPatch> {
        let score = match self.score {
            Some(raw) => Some(parse_score(Some(&raw))?),
            None => None,
        };
        Ok(ProgressPatch {
            status: self.status,
            score,
            time_spent: self.time_spent,
            notes: self.notes,
            favorite: None,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteRequest {
    pub score: Option<serde_json::Value>,
}

/// Raw values so that a wrong type gets the field-specific message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreRequest {
    pub score: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoriteRequest {
    pub favorite: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

fn progress_not_found() -> NihongoError {
    NihongoError::NotFound("Progresso não encontrado para esta lição".to_string())
}

/// Accepts any JSON number within 0..=100
pub fn parse_score(value: Option<&serde_json::Value>) -> Result<i64> {
    value
        .and_then(serde_json::Value::as_f64)
        .filter(|score| (0.0..=f64::from(MAX_SCORE)).contains(score))
        .map(|score| score.round() as i64)
        .ok_or_else(|| NihongoError::invalid("Pontuação deve estar entre 0 e 100"))
}

async fn list_with(
    ctx: RequestContext,
    user: User,
    state: AppState,
    query: ProgressQuery,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .progress_storage()
        .progress_by_user(&user.id, query)
        .await
        .map(ok);
    Ok(ctx.finish(result))
}

pub async fn my_progress(
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    list_with(ctx, user, state, ProgressQuery::default()).await
}

pub async fn completed(
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let query = ProgressQuery {
        status: Some(ProgressStatus::Completed),
        favorite_only: false,
    };
    list_with(ctx, user, state, query).await
}

pub async fn in_progress(
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let query = ProgressQuery {
        status: Some(ProgressStatus::InProgress),
        favorite_only: false,
    };
    list_with(ctx, user, state, query).await
}

pub async fn favorites(
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let query = ProgressQuery {
        status: None,
        favorite_only: true,
    };
    list_with(ctx, user, state, query).await
}

pub async fn my_stats(
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .progress_storage()
        .user_progress_stats(&user.id)
        .await
        .map(ok);
    Ok(ctx.finish(result))
}

pub async fn leaderboard(
    ctx: RequestContext,
    _user: User,
    query: LeaderboardQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let result = state
        .storage
        .progress_storage()
        .leaderboard(limit)
        .await
        .map(ok);
    Ok(ctx.finish(result))
}

pub async fn get_lesson_progress(
    lesson_id: String,
    ctx: RequestContext,
    user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .progress_storage()
        .get_progress(&user.id, &lesson_id)
        .await
        .and_then(|progress| progress.map(ok).ok_or_else(progress_not_found));
    Ok(ctx.finish(result))
}

/// Update the caller's record for a lesson, or start it when none exists
pub async fn record_progress(
    lesson_id: String,
    ctx: RequestContext,
    user: User,
    body: ProgressUpdateRequest,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(upsert_progress(&user, &lesson_id, body, &state).await))
}

async fn upsert_progress(
    user: &User,
    lesson_id: &str,
    body: ProgressUpdateRequest,
    state: &AppState,
) -> Result<Response> {
    let patch = body.into_patch()?;
    state
        .storage
        .lesson_storage()
        .get_lesson(lesson_id)
        .await?
        .ok_or_else(lesson_not_found)?;

    let progress = state.storage.progress_storage();
    if progress.get_progress(&user.id, lesson_id).await?.is_some() {
        let updated = progress
            .update_progress(&user.id, lesson_id, patch)
            .await?
            .ok_or_else(progress_not_found)?;
        return Ok(ok_with_message("Progresso atualizado com sucesso!", updated));
    }

    // A concurrent request may win the insert; the store reports that as a conflict
    let started = progress
        .create_progress(NewProgress {
            user_id: user.id.clone(),
            lesson_id: lesson_id.to_string(),
            status: patch.status.unwrap_or(ProgressStatus::InProgress),
            score: patch.score.unwrap_or(0),
            time_spent: patch.time_spent.unwrap_or(0),
            notes: patch.notes,
        })
        .await?;
    Ok(created("Progresso iniciado com sucesso!", started))
}

async fn patch_existing(
    user: &User,
    lesson_id: &str,
    patch: ProgressPatch,
    state: &AppState,
    message: &str,
) -> Result<Response> {
    let progress = state
        .storage
        .progress_storage()
        .update_progress(&user.id, lesson_id, patch)
        .await?
        .ok_or_else(progress_not_found)?;
    Ok(ok_with_message(message, progress))
}

pub async fn complete_lesson(
    lesson_id: String,
    ctx: RequestContext,
    user: User,
    body: CompleteRequest,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let score = match body.score {
        Some(raw) => parse_score(Some(&raw)),
        None => Ok(i64::from(MAX_SCORE)),
    };
    let result = match score {
        Ok(score) => {
            patch_existing(
                &user,
                &lesson_id,
                ProgressPatch::completed(score),
                &state,
                "Lição marcada como concluída!",
            )
            .await
        }
        Err(error) => Err(error),
    };
    Ok(ctx.finish(result))
}

pub async fn update_score(
    lesson_id: String,
    ctx: RequestContext,
    user: User,
    body: ScoreRequest,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = match parse_score(body.score.as_ref()) {
        Ok(score) => {
            patch_existing(
                &user,
                &lesson_id,
                ProgressPatch::score(score),
                &state,
                "Pontuação atualizada com sucesso!",
            )
            .await
        }
        Err(error) => Err(error),
    };
    Ok(ctx.finish(result))
}

pub async fn set_favorite(
    lesson_id: String,
    ctx: RequestContext,
    user: User,
    body: FavoriteRequest,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = match body.favorite.as_ref().and_then(serde_json::Value::as_bool) {
        Some(favorite) => {
            let message = if favorite {
                "Lição marcada como favorita!"
            } else {
                "Lição desmarcada como favorita!"
            };
            patch_existing(&user, &lesson_id, ProgressPatch::favorite(favorite), &state, message)
                .await
        }
        None => Err(NihongoError::invalid("Campo favorite deve ser um booleano")),
    };
    Ok(ctx.finish(result))
}

/// Another user's records; the ownership gate has already run
pub async fn user_progress(
    user_id: String,
    ctx: RequestContext,
    _caller: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .progress_storage()
        .progress_by_user(&user_id, ProgressQuery::default())
        .await
        .map(ok);
    Ok(ctx.finish(result))
}

pub async fn user_stats(
    user_id: String,
    ctx: RequestContext,
    _caller: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .progress_storage()
        .user_progress_stats(&user_id)
        .await
        .map(ok);
    Ok(ctx.finish(result))
}
