//! Lesson catalogue: listing, lookup, navigation and search

use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use warp::reply::Response;

use super::response::{ok, RequestContext};
use crate::auth::user::{Level, User};
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::core::state::AppState;
use crate::error::{NihongoError, Result};
use crate::storage::models::{Lesson, LessonCategory};

#[derive(Debug, Default, Deserialize)]
pub struct LessonListQuery {
    pub level: Option<Level>,
    pub category: Option<LessonCategory>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
}

/// One page of a listing plus the numbers a client needs to navigate it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub current: usize,
    pub size: usize,
    pub total: usize,
}

impl Page {
    pub fn new(page: Option<usize>, limit: Option<usize>, total: usize) -> Self {
        Self {
            current: page.unwrap_or(1).max(1),
            size: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            total,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.size)
    }

    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.current.saturating_sub(1).saturating_mul(self.size))
            .take(self.size)
            .cloned()
            .collect()
    }
}

pub(crate) fn lesson_not_found() -> NihongoError {
    NihongoError::NotFound("Lição não encontrada".to_string())
}

/// Inactive lessons are hidden from the public catalogue
async fn active_lesson(state: &AppState, lesson_id: &str) -> Result<Lesson> {
    state
        .storage
        .lesson_storage()
        .get_lesson(lesson_id)
        .await?
        .filter(|lesson| lesson.is_active)
        .ok_or_else(lesson_not_found)
}

pub async fn list_lessons(
    ctx: RequestContext,
    query: LessonListQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(list_page(query, &state).await))
}

async fn list_page(query: LessonListQuery, state: &AppState) -> Result<Response> {
    let lessons = state.storage.lesson_storage();
    let matching = match (query.level, query.category) {
        (Some(level), Some(category)) => {
            lessons.lessons_by_level_and_category(level, category).await?
        }
        (Some(level), None) => lessons.lessons_by_level(level).await?,
        (None, category) => lessons
            .list_active_lessons()
            .await?
            .into_iter()
            .filter(|lesson| category.map_or(true, |c| lesson.category == c))
            .collect(),
    };

    let page = Page::new(query.page, query.limit, matching.len());
    Ok(ok(json!({
        "lessons": page.slice(&matching),
        "pagination": {
            "currentPage": page.current,
            "totalPages": page.total_pages(),
            "totalLessons": page.total,
            "hasNextPage": page.current < page.total_pages(),
            "hasPrevPage": page.current > 1,
        }
    })))
}

pub async fn get_lesson(
    lesson_id: String,
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(lesson_with_vocabulary(&lesson_id, &state).await))
}

async fn lesson_with_vocabulary(lesson_id: &str, state: &AppState) -> Result<Response> {
    let lesson = active_lesson(state, lesson_id).await?;
    let vocabulary = state
        .storage
        .vocabulary_storage()
        .vocabulary_by_lesson(&lesson.id)
        .await?;
    Ok(ok(json!({ "lesson": lesson, "vocabulary": vocabulary })))
}

pub async fn lesson_vocabulary(
    lesson_id: String,
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(vocabulary_of(&lesson_id, &state).await))
}

async fn vocabulary_of(lesson_id: &str, state: &AppState) -> Result<Response> {
    let lesson = active_lesson(state, lesson_id).await?;
    let vocabulary = state
        .storage
        .vocabulary_storage()
        .vocabulary_by_lesson(&lesson.id)
        .await?;
    Ok(ok(vocabulary))
}

pub async fn next_lesson(
    lesson_id: String,
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .lesson_storage()
        .next_lesson(&lesson_id)
        .await
        .and_then(|next| {
            next.map(ok).ok_or_else(|| {
                NihongoError::NotFound("Não há próxima lição disponível".to_string())
            })
        });
    Ok(ctx.finish(result))
}

pub async fn previous_lesson(
    lesson_id: String,
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .lesson_storage()
        .previous_lesson(&lesson_id)
        .await
        .and_then(|previous| {
            previous.map(ok).ok_or_else(|| {
                NihongoError::NotFound("Não há lição anterior disponível".to_string())
            })
        });
    Ok(ctx.finish(result))
}

pub async fn search_lessons(
    term: String,
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = if term.trim().is_empty() {
        Err(NihongoError::invalid("Termo de busca é obrigatório"))
    } else {
        state
            .storage
            .lesson_storage()
            .search_lessons(term.trim())
            .await
            .map(ok)
    };
    Ok(ctx.finish(result))
}

/// Tier-gated listing; the gate has already run when this is reached
pub async fn lessons_by_level(
    level: Level,
    ctx: RequestContext,
    _user: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .lesson_storage()
        .lessons_by_level(level)
        .await
        .map(ok);
    Ok(ctx.finish(result))
}

pub async fn lessons_by_category(
    category: String,
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(category_listing(&category, &state).await))
}

async fn category_listing(category: &str, state: &AppState) -> Result<Response> {
    let category: LessonCategory = category.parse()?;
    let lessons: Vec<Lesson> = state
        .storage
        .lesson_storage()
        .list_active_lessons()
        .await?
        .into_iter()
        .filter(|lesson| lesson.category == category)
        .collect();
    Ok(ok(lessons))
}

pub async fn lesson_stats(
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state.storage.lesson_storage().lesson_stats().await.map(ok);
    Ok(ctx.finish(result))
}
