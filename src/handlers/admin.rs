//! Administration panel: raw collections, global statistics and content upkeep

use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use warp::reply::Response;

use super::lessons::lesson_not_found;
use super::response::{created, message, ok, ok_with_message, RequestContext};
use crate::auth::user::User;
use crate::constants::{DEFAULT_ADMIN_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::core::state::AppState;
use crate::error::{NihongoError, Result};
use crate::storage::models::{LessonPatch, NewLesson, NewVocabulary};

#[derive(Debug, Default, Deserialize)]
pub struct DocumentQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
}

fn require_text(errors: &mut Vec<String>, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.push(message.to_string());
    }
}

fn check_new_lesson(lesson: &NewLesson) -> Result<()> {
    let mut errors = Vec::new();
    require_text(&mut errors, &lesson.title, "Título é obrigatório");
    if lesson.order == 0 {
        errors.push("Ordem deve ser maior que zero".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(NihongoError::validation(errors))
    }
}

fn check_new_vocabulary(entry: &NewVocabulary) -> Result<()> {
    let mut errors = Vec::new();
    require_text(&mut errors, &entry.japanese, "Termo em japonês é obrigatório");
    require_text(&mut errors, &entry.romaji, "Romaji é obrigatório");
    require_text(&mut errors, &entry.portuguese, "Tradução em português é obrigatória");
    require_text(&mut errors, &entry.category, "Categoria é obrigatória");
    if errors.is_empty() {
        Ok(())
    } else {
        Err(NihongoError::validation(errors))
    }
}

pub async fn stats(
    ctx: RequestContext,
    _admin: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state.storage.admin_storage().admin_stats().await.map(ok);
    Ok(ctx.finish(result))
}

pub async fn collections(
    ctx: RequestContext,
    _admin: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .admin_storage()
        .list_collections()
        .await
        .map(ok);
    Ok(ctx.finish(result))
}

pub async fn collection_documents(
    name: String,
    ctx: RequestContext,
    _admin: User,
    query: DocumentQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(page_documents(&name, query, &state).await))
}

async fn page_documents(name: &str, query: DocumentQuery, state: &AppState) -> Result<Response> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ADMIN_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let documents = state
        .storage
        .admin_storage()
        .list_documents(name, query.search.as_deref(), page, limit)
        .await?
        .ok_or_else(|| NihongoError::NotFound("Coleção não encontrada".to_string()))?;

    Ok(ok(json!({
        "documents": documents.documents,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": documents.total,
            "pages": documents.total.div_ceil(limit),
        }
    })))
}

pub async fn document(
    name: String,
    document_id: String,
    ctx: RequestContext,
    _admin: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .admin_storage()
        .get_document(&name, &document_id)
        .await
        .and_then(|document| {
            document
                .map(ok)
                .ok_or_else(|| NihongoError::NotFound("Documento não encontrado".to_string()))
        });
    Ok(ctx.finish(result))
}

pub async fn create_lesson(
    ctx: RequestContext,
    admin: User,
    body: NewLesson,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(insert_lesson(&admin, body, &state).await))
}

async fn insert_lesson(admin: &User, body: NewLesson, state: &AppState) -> Result<Response> {
    check_new_lesson(&body)?;
    let lesson = state.storage.lesson_storage().create_lesson(body).await?;
    log::info!("Admin {} created lesson {}", admin.id, lesson.id);
    Ok(created("Lição criada com sucesso!", lesson))
}

pub async fn update_lesson(
    lesson_id: String,
    ctx: RequestContext,
    admin: User,
    body: LessonPatch,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .lesson_storage()
        .update_lesson(&lesson_id, body)
        .await
        .and_then(|lesson| lesson.ok_or_else(lesson_not_found))
        .map(|lesson| {
            log::info!("Admin {} updated lesson {}", admin.id, lesson.id);
            ok_with_message("Lição atualizada com sucesso!", lesson)
        });
    Ok(ctx.finish(result))
}

pub async fn deactivate_lesson(
    lesson_id: String,
    ctx: RequestContext,
    admin: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = match state
        .storage
        .lesson_storage()
        .deactivate_lesson(&lesson_id)
        .await
    {
        Ok(true) => {
            log::info!("Admin {} deactivated lesson {}", admin.id, lesson_id);
            Ok(message("Lição desativada com sucesso!"))
        }
        Ok(false) => Err(lesson_not_found()),
        Err(error) => Err(error),
    };
    Ok(ctx.finish(result))
}

pub async fn create_vocabulary(
    ctx: RequestContext,
    admin: User,
    body: NewVocabulary,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(insert_vocabulary(&admin, body, &state).await))
}

async fn insert_vocabulary(admin: &User, body: NewVocabulary, state: &AppState) -> Result<Response> {
    check_new_vocabulary(&body)?;
    state
        .storage
        .lesson_storage()
        .get_lesson(&body.lesson_id)
        .await?
        .ok_or_else(lesson_not_found)?;

    let entry = state.storage.vocabulary_storage().create_vocabulary(body).await?;
    log::info!("Admin {} created vocabulary {}", admin.id, entry.id);
    Ok(created("Vocabulário criado com sucesso!", entry))
}

pub async fn deactivate_vocabulary(
    vocabulary_id: String,
    ctx: RequestContext,
    admin: User,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = match state
        .storage
        .vocabulary_storage()
        .deactivate_vocabulary(&vocabulary_id)
        .await
    {
        Ok(true) => {
            log::info!("Admin {} deactivated vocabulary {}", admin.id, vocabulary_id);
            Ok(message("Vocabulário desativado com sucesso!"))
        }
        Ok(false) => Err(NihongoError::NotFound("Vocabulário não encontrado".to_string())),
        Err(error) => Err(error),
    };
    Ok(ctx.finish(result))
}
