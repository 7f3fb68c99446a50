//! Vocabulary lookup, practice sampling and study sessions

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use uuid::Uuid;
use warp::reply::Response;

use super::response::{ok, RequestContext};
use crate::auth::user::{Level, User};
use crate::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_PRACTICE_SIZE, DEFAULT_REVIEW_SIZE, DEFAULT_TEST_SIZE,
    MAX_PAGE_SIZE, TEST_DISTRACTORS,
};
use crate::core::state::AppState;
use crate::error::{NihongoError, Result};
use crate::storage::models::{VocabularyEntry, VocabularyFilter};

#[derive(Debug, Default, Deserialize)]
pub struct VocabularyQuery {
    pub level: Option<Level>,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

impl VocabularyQuery {
    fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
    }

    fn keep(&self, entries: Vec<VocabularyEntry>) -> Vec<VocabularyEntry> {
        let filter = VocabularyFilter {
            level: self.level,
            category: self.category.clone(),
        };
        entries
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .take(self.limit_or(DEFAULT_PAGE_SIZE))
            .collect()
    }
}

/// Multiple-choice question built from one entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestQuestion {
    pub id: usize,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub vocabulary_id: String,
}

/// Pair every entry with distractors taken from other entries' translations
pub fn build_test_questions(
    entries: &[VocabularyEntry],
    pool: &[VocabularyEntry],
) -> Vec<TestQuestion> {
    let mut rng = rand::thread_rng();
    let mut translations: Vec<&str> = pool
        .iter()
        .chain(entries)
        .map(|entry| entry.portuguese.as_str())
        .collect();
    translations.sort_unstable();
    translations.dedup();

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let wrong: Vec<&str> = translations
                .iter()
                .copied()
                .filter(|candidate| *candidate != entry.portuguese)
                .collect();
            let mut options: Vec<String> = wrong
                .choose_multiple(&mut rng, TEST_DISTRACTORS)
                .map(|option| option.to_string())
                .collect();
            options.push(entry.portuguese.clone());
            options.shuffle(&mut rng);

            TestQuestion {
                id: index + 1,
                question: entry.japanese.clone(),
                options,
                correct_answer: entry.portuguese.clone(),
                vocabulary_id: entry.id.clone(),
            }
        })
        .collect()
}

pub async fn by_lesson(
    lesson_id: String,
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .vocabulary_storage()
        .vocabulary_by_lesson(&lesson_id)
        .await
        .map(ok);
    Ok(ctx.finish(result))
}

pub async fn by_category(
    category: String,
    ctx: RequestContext,
    query: VocabularyQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .vocabulary_storage()
        .vocabulary_by_category(&category)
        .await
        .map(|entries| ok(query.keep(entries)));
    Ok(ctx.finish(result))
}

pub async fn by_level(
    level: String,
    ctx: RequestContext,
    query: VocabularyQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(level_listing(&level, query, &state).await))
}

async fn level_listing(level: &str, query: VocabularyQuery, state: &AppState) -> Result<Response> {
    let level: Level = level.parse()?;
    let entries = state
        .storage
        .vocabulary_storage()
        .vocabulary_by_level(level)
        .await?;
    Ok(ok(query.keep(entries)))
}

pub async fn search(
    term: String,
    ctx: RequestContext,
    query: VocabularyQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = if term.trim().is_empty() {
        Err(NihongoError::invalid("Termo de busca é obrigatório"))
    } else {
        state
            .storage
            .vocabulary_storage()
            .search_vocabulary(term.trim())
            .await
            .map(|entries| ok(query.keep(entries)))
    };
    Ok(ctx.finish(result))
}

/// Tag lookup is scoped to one level, beginner unless asked otherwise
pub async fn by_tag(
    tag: String,
    ctx: RequestContext,
    query: VocabularyQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let tag = tag.to_lowercase();
    let limit = query.limit_or(DEFAULT_PAGE_SIZE);
    let result = state
        .storage
        .vocabulary_storage()
        .vocabulary_by_level(query.level.unwrap_or_default())
        .await
        .map(|entries| {
            let tagged: Vec<VocabularyEntry> = entries
                .into_iter()
                .filter(|entry| entry.has_tag_like(&tag))
                .take(limit)
                .collect();
            ok(tagged)
        });
    Ok(ctx.finish(result))
}

pub async fn random_practice(
    ctx: RequestContext,
    query: VocabularyQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let filter = VocabularyFilter {
        level: query.level,
        category: query.category.clone(),
    };
    let result = state
        .storage
        .vocabulary_storage()
        .random_vocabulary(query.limit_or(DEFAULT_PRACTICE_SIZE), filter)
        .await
        .map(ok);
    Ok(ctx.finish(result))
}

pub async fn get_entry(
    vocabulary_id: String,
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .vocabulary_storage()
        .get_vocabulary(&vocabulary_id)
        .await
        .and_then(|entry| {
            entry
                .filter(|entry| entry.is_active)
                .map(ok)
                .ok_or_else(|| NihongoError::NotFound("Vocabulário não encontrado".to_string()))
        });
    Ok(ctx.finish(result))
}

/// Review deck drawn at the requested level, or the caller's own level
pub async fn review_session(
    ctx: RequestContext,
    user: User,
    query: VocabularyQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(draw_review(&user, query, &state).await))
}

async fn draw_review(user: &User, query: VocabularyQuery, state: &AppState) -> Result<Response> {
    let level = query.level.unwrap_or(user.level);
    let filter = VocabularyFilter {
        level: Some(level),
        category: query.category.clone(),
    };
    let vocabulary = state
        .storage
        .vocabulary_storage()
        .random_vocabulary(query.limit_or(DEFAULT_REVIEW_SIZE), filter)
        .await?;

    Ok(ok(json!({
        "sessionId": Uuid::new_v4().to_string(),
        "totalWords": vocabulary.len(),
        "vocabulary": vocabulary,
        "level": level,
        "category": query.category.as_deref().unwrap_or("mixed"),
    })))
}

pub async fn test_session(
    ctx: RequestContext,
    user: User,
    query: VocabularyQuery,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    Ok(ctx.finish(draw_test(&user, query, &state).await))
}

async fn draw_test(user: &User, query: VocabularyQuery, state: &AppState) -> Result<Response> {
    let level = query.level.unwrap_or(user.level);
    let vocabulary = state.storage.vocabulary_storage();
    let entries = vocabulary
        .random_vocabulary(
            query.limit_or(DEFAULT_TEST_SIZE),
            VocabularyFilter {
                level: Some(level),
                category: query.category.clone(),
            },
        )
        .await?;
    let pool = vocabulary
        .random_vocabulary(
            MAX_PAGE_SIZE,
            VocabularyFilter {
                level: Some(level),
                category: None,
            },
        )
        .await?;

    let questions = build_test_questions(&entries, &pool);
    Ok(ok(json!({
        "sessionId": Uuid::new_v4().to_string(),
        "totalQuestions": questions.len(),
        "testQuestions": questions,
        "level": level,
        "category": query.category.as_deref().unwrap_or("mixed"),
    })))
}

pub async fn stats(
    ctx: RequestContext,
    state: AppState,
) -> std::result::Result<Response, Infallible> {
    let result = state
        .storage
        .vocabulary_storage()
        .vocabulary_stats()
        .await
        .map(ok);
    Ok(ctx.finish(result))
}
